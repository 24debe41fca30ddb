use crate::actor::{ActorClient, NodeActor};
use crate::master::MasterService;
use crate::membership::StaticMembership;
use crate::node::{LocalStateReader, NodeApplier};
use crate::state::{DiscoveryNode, DiscoveryNodes, NodeId};
use crate::transport::LocalTransport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Duration;

/// Nodes wired over a `LocalTransport` with the first node as master.
pub(crate) struct TestCluster {
    pub(crate) master: MasterService,
    pub(crate) readers: BTreeMap<NodeId, LocalStateReader>,
    pub(crate) transport: LocalTransport,
    pub(crate) membership: StaticMembership,
    // Keeps the actors alive.
    _clients: Vec<ActorClient>,
}

impl TestCluster {
    pub(crate) fn start(ids: &[&str]) -> Self {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let transport = LocalTransport::new(logger.clone());
        let mut readers = BTreeMap::new();
        let mut clients = Vec::new();

        for id in ids {
            let node_id = NodeId::new(*id);
            let (applier, reader) = NodeApplier::new(logger.clone(), node_id.clone());
            let (client, queue) = ActorClient::new(16);
            tokio::spawn(NodeActor::new(logger.clone(), queue, applier).run_event_loop());
            transport.register(node_id.clone(), client.weak());
            readers.insert(node_id, reader);
            clients.push(client);
        }

        let membership = StaticMembership::new(DiscoveryNodes::new(ids.iter().map(|id| DiscoveryNode::data_node(*id))));
        let master = MasterService::new(
            logger,
            NodeId::new(ids[0]),
            Arc::new(transport.clone()),
            Arc::new(membership.clone()),
            Duration::from_secs(30),
        );

        TestCluster {
            master,
            readers,
            transport,
            membership,
            _clients: clients,
        }
    }

    pub(crate) fn reader(&self, id: &str) -> &LocalStateReader {
        &self.readers[&NodeId::new(id)]
    }
}
