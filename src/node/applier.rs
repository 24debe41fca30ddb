use crate::node::apply_api::{ApplyAck, ApplyError};
use crate::node::local_state::{self, LocalStatePublisher, LocalStateReader};
use crate::state::{ClusterState, NodeId};
use std::cmp::Ordering;
use std::sync::Arc;

/// NodeApplier makes a published cluster state the node's current state. It runs on every node,
/// the master included, and is always driven by the node's actor so applies are serialized.
pub struct NodeApplier {
    logger: slog::Logger,
    node_id: NodeId,
    local_state: LocalStatePublisher,
}

impl NodeApplier {
    pub fn new(logger: slog::Logger, node_id: NodeId) -> (Self, LocalStateReader) {
        let (local_state, reader) = local_state::new(Arc::new(ClusterState::initial()));
        let applier = NodeApplier {
            logger,
            node_id,
            local_state,
        };

        (applier, reader)
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn handle_apply(&mut self, proposed: Arc<ClusterState>) -> Result<ApplyAck, ApplyError> {
        let current = self.local_state.current();
        let last_applied = current.version();

        match proposed.version().cmp(&last_applied) {
            Ordering::Less => {
                slog::info!(
                    self.logger,
                    "Ignoring stale cluster state version {} (last applied {})",
                    proposed.version(),
                    last_applied
                );
                Err(ApplyError::StaleVersion {
                    proposed: proposed.version(),
                    last_applied,
                })
            }
            Ordering::Equal => {
                if Arc::ptr_eq(&current, &proposed) || *current == *proposed {
                    slog::debug!(self.logger, "Version {} already applied. Re-acking.", last_applied);
                    Ok(self.ack(&proposed))
                } else {
                    slog::error!(
                        self.logger,
                        "Received different content for already applied version {}. Keeping local state.",
                        last_applied
                    );
                    Err(ApplyError::ConflictingState { version: last_applied })
                }
            }
            Ordering::Greater => {
                let ack = self.ack(&proposed);
                self.local_state.publish(proposed);
                slog::info!(self.logger, "Applied cluster state version {}", ack.version);
                Ok(ack)
            }
        }
    }

    fn ack(&self, state: &ClusterState) -> ApplyAck {
        ApplyAck {
            node_id: self.node_id.clone(),
            version: state.version(),
        }
    }
}
