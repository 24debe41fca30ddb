use crate::state::{NodeId, Version};

/// ApplyAck is the reply a node sends once a state version is its current state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplyAck {
    pub node_id: NodeId,
    pub version: Version,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("proposed version {proposed} is older than last applied version {last_applied}")]
    StaleVersion { proposed: Version, last_applied: Version },
    // Two different states were published under the same version. Should never happen with a single
    // proposer.
    #[error("version {version} was already applied with different content")]
    ConflictingState { version: Version },
    #[error("node actor has exited")]
    ActorExited,
}
