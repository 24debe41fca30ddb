use crate::actor::WeakActorClient;
use crate::node::{ApplyAck, ApplyError};
use crate::state::{ClusterState, NodeId};
use crate::transport::node_transport::{NodeTransport, TransportError};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::time::Duration;

/// LinkFault is the behaviour of the link from the master to one node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkFault {
    Healthy,
    /// Every delivery is held back by this long.
    Delayed(Duration),
    /// Every delivery is held back by a random duration in `[min, max]`.
    Jittered { min: Duration, max: Duration },
    /// Deliveries fail right away. The node is not told about the state.
    Unreachable,
}

impl Default for LinkFault {
    fn default() -> Self {
        LinkFault::Healthy
    }
}

impl LinkFault {
    fn delay(&self) -> Option<Duration> {
        match *self {
            LinkFault::Healthy | LinkFault::Unreachable => None,
            LinkFault::Delayed(delay) => Some(delay),
            LinkFault::Jittered { min, max } => {
                if min >= max {
                    Some(min)
                } else {
                    Some(rand::thread_rng().gen_range(min..=max))
                }
            }
        }
    }
}

struct Link {
    actor_client: WeakActorClient,
    fault: LinkFault,
}

/// LocalTransport routes states straight into each node's actor queue, in process.
#[derive(Clone)]
pub struct LocalTransport {
    logger: slog::Logger,
    links: Arc<RwLock<HashMap<NodeId, Link>>>,
}

impl LocalTransport {
    pub fn new(logger: slog::Logger) -> Self {
        LocalTransport {
            logger,
            links: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register(&self, node_id: NodeId, actor_client: WeakActorClient) {
        let mut links = self.links.write().expect("LocalTransport lock poisoned");
        links.insert(
            node_id,
            Link {
                actor_client,
                fault: LinkFault::Healthy,
            },
        );
    }

    /// Returns false if the node is not registered.
    pub fn set_fault(&self, node_id: &NodeId, fault: LinkFault) -> bool {
        let mut links = self.links.write().expect("LocalTransport lock poisoned");
        match links.get_mut(node_id) {
            Some(link) => {
                slog::info!(self.logger, "Link to {} is now {:?}", node_id, fault);
                link.fault = fault;
                true
            }
            None => false,
        }
    }

    pub fn heal_all(&self) {
        let mut links = self.links.write().expect("LocalTransport lock poisoned");
        for link in links.values_mut() {
            link.fault = LinkFault::Healthy;
        }
    }

    fn link(&self, node_id: &NodeId) -> Option<(WeakActorClient, LinkFault)> {
        let links = self.links.read().expect("LocalTransport lock poisoned");
        links.get(node_id).map(|link| (link.actor_client.clone(), link.fault))
    }
}

#[async_trait::async_trait]
impl NodeTransport for LocalTransport {
    async fn send_state(&self, node_id: &NodeId, state: Arc<ClusterState>) -> Result<ApplyAck, TransportError> {
        let (actor_client, fault) = self
            .link(node_id)
            .ok_or_else(|| TransportError::UnknownNode(node_id.clone()))?;

        if fault == LinkFault::Unreachable {
            return Err(TransportError::Unreachable(node_id.clone()));
        }
        if let Some(delay) = fault.delay() {
            tokio::time::sleep(delay).await;
        }

        actor_client.apply_state(state).await.map_err(|e| match e {
            ApplyError::ActorExited => TransportError::Unreachable(node_id.clone()),
            source => TransportError::Rejected {
                node_id: node_id.clone(),
                source,
            },
        })
    }
}
