use crate::state::{ClusterState, Version};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// AppliedState is what a node currently serves: the state snapshot and when it was applied.
#[derive(Clone, Debug)]
pub struct AppliedState {
    pub state: Arc<ClusterState>,
    pub applied_at: DateTime<Utc>,
}

pub(super) fn new(initial_state: Arc<ClusterState>) -> (LocalStatePublisher, LocalStateReader) {
    let (snd, rcv) = watch::channel(AppliedState {
        state: initial_state,
        applied_at: Utc::now(),
    });

    (LocalStatePublisher { snd }, LocalStateReader { rcv })
}

/// Write side, owned by the node applier. Swapping in a new `Arc` is the only way the local state
/// changes, so readers see either the old snapshot or the new one.
pub(super) struct LocalStatePublisher {
    snd: watch::Sender<AppliedState>,
}

impl LocalStatePublisher {
    pub(super) fn current(&self) -> Arc<ClusterState> {
        self.snd.borrow().state.clone()
    }

    pub(super) fn publish(&self, state: Arc<ClusterState>) {
        self.snd.send_replace(AppliedState {
            state,
            applied_at: Utc::now(),
        });
    }
}

/// LocalStateReader is the read-only view of one node's applied cluster state.
#[derive(Clone)]
pub struct LocalStateReader {
    rcv: watch::Receiver<AppliedState>,
}

impl LocalStateReader {
    pub fn current(&self) -> Arc<ClusterState> {
        self.rcv.borrow().state.clone()
    }

    pub fn last_applied_version(&self) -> Version {
        self.rcv.borrow().state.version()
    }

    pub fn last_applied_at(&self) -> DateTime<Utc> {
        self.rcv.borrow().applied_at
    }

    /// Waits until the node has applied `version` (or anything newer) and returns that state.
    /// Returns `None` if the node shut down first.
    pub async fn wait_for_version(&self, version: Version) -> Option<Arc<ClusterState>> {
        let mut rcv = self.rcv.clone();
        loop {
            {
                let applied = rcv.borrow_and_update();
                if applied.state.version() >= version {
                    return Some(applied.state.clone());
                }
            }

            if rcv.changed().await.is_err() {
                return None;
            }
        }
    }
}
