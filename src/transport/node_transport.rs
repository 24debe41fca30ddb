use crate::node::{ApplyAck, ApplyError};
use crate::state::{ClusterState, NodeId};
use std::sync::Arc;

/// NodeTransport delivers a published state to one node and returns its reply.
///
/// Implementations must not hold up other deliveries: the coordinator calls `send_state` once per
/// node, each on its own task.
#[async_trait::async_trait]
pub trait NodeTransport: Send + Sync {
    async fn send_state(&self, node_id: &NodeId, state: Arc<ClusterState>) -> Result<ApplyAck, TransportError>;
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("node {0} is unreachable")]
    Unreachable(NodeId),
    #[error("node {0} is not registered with the transport")]
    UnknownNode(NodeId),
    #[error("node {node_id} rejected the state: {source}")]
    Rejected { node_id: NodeId, source: ApplyError },
}

impl TransportError {
    pub fn node_id(&self) -> &NodeId {
        match self {
            TransportError::Unreachable(node_id) => node_id,
            TransportError::UnknownNode(node_id) => node_id,
            TransportError::Rejected { node_id, .. } => node_id,
        }
    }
}
