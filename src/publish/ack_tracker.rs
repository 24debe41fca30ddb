use crate::node::ApplyAck;
use crate::state::{NodeId, Version};
use crate::transport::TransportError;
use std::collections::{BTreeMap, BTreeSet};
use tokio::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PublishOutcome {
    /// Every target node applied the state before the timeout.
    Acknowledged,
    /// The timeout was zero or elapsed, or some node can no longer ack. Delivery carries on.
    TimedOut,
}

/// PublishRound is the result of publishing one state version.
#[derive(Clone, Debug)]
pub struct PublishRound {
    pub version: Version,
    pub outcome: PublishOutcome,
    pub acked_nodes: BTreeSet<NodeId>,
    /// Targets that hadn't replied when the outcome was decided.
    pub pending_nodes: BTreeSet<NodeId>,
    pub failed_nodes: BTreeMap<NodeId, TransportError>,
    pub elapsed: Duration,
}

impl PublishRound {
    pub fn is_acknowledged(&self) -> bool {
        self.outcome == PublishOutcome::Acknowledged
    }
}

/// One delivery task's report back to the coordinator.
#[derive(Debug)]
pub(crate) struct NodeReply {
    pub(crate) node_id: NodeId,
    pub(crate) result: Result<ApplyAck, TransportError>,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Recorded {
    Acked,
    Failed,
    /// Reply from a node outside the target set, a second reply from the same node, or an ack for
    /// some other version.
    Ignored,
}

/// AckTracker counts replies for one round against its fixed target set.
pub(crate) struct AckTracker {
    version: Version,
    targets: BTreeSet<NodeId>,
    acked: BTreeSet<NodeId>,
    failed: BTreeMap<NodeId, TransportError>,
    reported: BTreeSet<NodeId>,
}

impl AckTracker {
    pub(crate) fn new(version: Version, targets: BTreeSet<NodeId>) -> Self {
        AckTracker {
            version,
            targets,
            acked: BTreeSet::new(),
            failed: BTreeMap::new(),
            reported: BTreeSet::new(),
        }
    }

    pub(crate) fn record(&mut self, reply: NodeReply) -> Recorded {
        if !self.targets.contains(&reply.node_id) || !self.reported.insert(reply.node_id.clone()) {
            return Recorded::Ignored;
        }

        match reply.result {
            Ok(ack) if ack.version == self.version && ack.node_id == reply.node_id => {
                self.acked.insert(reply.node_id);
                Recorded::Acked
            }
            Ok(_) => Recorded::Ignored,
            Err(e) => {
                self.failed.insert(reply.node_id, e);
                Recorded::Failed
            }
        }
    }

    pub(crate) fn all_acked(&self) -> bool {
        self.acked.len() == self.targets.len()
    }

    pub(crate) fn finish(self, outcome: PublishOutcome, elapsed: Duration) -> PublishRound {
        let pending_nodes = self
            .targets
            .iter()
            .filter(|n| !self.reported.contains(*n))
            .cloned()
            .collect();

        PublishRound {
            version: self.version,
            outcome,
            acked_nodes: self.acked,
            pending_nodes,
            failed_nodes: self.failed,
            elapsed,
        }
    }
}
