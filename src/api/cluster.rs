use crate::actor::{ActorClient, NodeActor};
use crate::api::types::MemberInfo;
use crate::master::{
    CreateIndexError, CreateIndexRequest, CreateIndexResponse, MasterService, RerouteResponse, ShardStateResponse,
    UpdateSettingsError, UpdateTransientSettingsRequest, UpdateTransientSettingsResponse,
};
use crate::membership::StaticMembership;
use crate::node::{LocalStateReader, NodeApplier};
use crate::routing::ShardEvent;
use crate::state::{ClusterState, DiscoveryNode, NodeId};
use crate::transport::{LinkFault, LocalTransport};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Duration;

/// ClusterAdminClient is the handle applications use to change the cluster. Cheap to clone.
#[derive(Clone)]
pub struct ClusterAdminClient {
    master: Arc<MasterService>,
}

impl ClusterAdminClient {
    pub(super) fn new(master: Arc<MasterService>) -> Self {
        ClusterAdminClient { master }
    }

    pub async fn update_transient_settings(
        &self,
        request: UpdateTransientSettingsRequest,
    ) -> Result<UpdateTransientSettingsResponse, UpdateSettingsError> {
        self.master.update_transient_settings(request).await
    }

    pub async fn create_index(&self, request: CreateIndexRequest) -> Result<CreateIndexResponse, CreateIndexError> {
        self.master.create_index(request).await
    }

    pub async fn shards_started(&self, events: Vec<ShardEvent>, timeout: Option<Duration>) -> ShardStateResponse {
        self.master.shards_started(events, timeout).await
    }

    pub async fn start_initializing_shards(&self, timeout: Option<Duration>) -> ShardStateResponse {
        self.master.start_initializing_shards(timeout).await
    }

    pub async fn complete_relocations(&self, timeout: Option<Duration>) -> ShardStateResponse {
        self.master.complete_relocations(timeout).await
    }

    pub async fn reroute(&self, timeout: Option<Duration>) -> RerouteResponse {
        self.master.reroute(timeout).await
    }

    /// Last state published by the master.
    pub async fn state(&self) -> Arc<ClusterState> {
        self.master.state().await
    }
}

/// NodeHandle keeps one node running and gives read access to its applied state. Dropping the
/// handle stops the node.
pub struct NodeHandle {
    node_id: NodeId,
    local_state: LocalStateReader,
    _actor_client: ActorClient,
}

impl NodeHandle {
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn local_state(&self) -> &LocalStateReader {
        &self.local_state
    }
}

/// LocalCluster is a whole cluster in one process: a master, its member nodes, the transport
/// between them and the membership list.
pub struct LocalCluster {
    logger: slog::Logger,
    admin: ClusterAdminClient,
    nodes: BTreeMap<NodeId, NodeHandle>,
    transport: LocalTransport,
    membership: StaticMembership,
    node_event_queue_size: usize,
}

impl LocalCluster {
    pub(super) fn new(
        logger: slog::Logger,
        admin: ClusterAdminClient,
        nodes: BTreeMap<NodeId, NodeHandle>,
        transport: LocalTransport,
        membership: StaticMembership,
        node_event_queue_size: usize,
    ) -> Self {
        LocalCluster {
            logger,
            admin,
            nodes,
            transport,
            membership,
            node_event_queue_size,
        }
    }

    pub fn admin(&self) -> &ClusterAdminClient {
        &self.admin
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeHandle> {
        self.nodes.get(&NodeId::new(node_id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.values()
    }

    /// Returns false if there is no such node.
    pub fn set_link_fault(&self, node_id: &str, fault: LinkFault) -> bool {
        self.transport.set_fault(&NodeId::new(node_id), fault)
    }

    pub fn heal_all_links(&self) {
        self.transport.heal_all();
    }

    /// Starts a node and adds it to the membership. It receives states from the next round on;
    /// call `reroute` to give it shards.
    pub fn join_node(&mut self, member: MemberInfo) -> &NodeHandle {
        let handle = spawn_node(&self.logger, &self.transport, &member, self.node_event_queue_size);
        self.membership.add(DiscoveryNode::from(member));
        let node_id = handle.node_id.clone();
        // Rejoining replaces the old node.
        self.nodes.insert(node_id.clone(), handle);
        &self.nodes[&node_id]
    }

    /// Removes a node from the membership and stops it.
    pub fn remove_node(&mut self, node_id: &str) -> bool {
        let node_id = NodeId::new(node_id);
        self.membership.remove(&node_id);
        self.nodes.remove(&node_id).is_some()
    }
}

pub(super) fn spawn_node(
    logger: &slog::Logger,
    transport: &LocalTransport,
    member: &MemberInfo,
    queue_size: usize,
) -> NodeHandle {
    let node_id = NodeId::new(member.node_id.clone());
    let logger = logger.new(slog::o!("NodeId" => member.node_id.clone()));

    let (applier, local_state) = NodeApplier::new(logger.clone(), node_id.clone());
    let (actor_client, actor_queue) = ActorClient::new(queue_size);
    tokio::spawn(NodeActor::new(logger, actor_queue, applier).run_event_loop());
    transport.register(node_id.clone(), actor_client.weak());

    NodeHandle {
        node_id,
        local_state,
        _actor_client: actor_client,
    }
}
