use crate::publish::ack_tracker::{AckTracker, NodeReply, PublishOutcome, PublishRound, Recorded};
use crate::publish::time::{Clock, RealClock};
use crate::state::{ClusterState, NodeId};
use crate::transport::NodeTransport;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// PublishCoordinator drives one publish round at a time: fan the state out to every node in
/// it (plus the master itself), then wait for acks up to the timeout.
///
/// The coordinator does not serialize rounds. Callers (the master service) hold a lock across a
/// round.
pub struct PublishCoordinator<C: Clock = RealClock> {
    logger: slog::Logger,
    local_node_id: NodeId,
    transport: Arc<dyn NodeTransport>,
    clock: C,
}

impl PublishCoordinator {
    pub fn new(logger: slog::Logger, local_node_id: NodeId, transport: Arc<dyn NodeTransport>) -> Self {
        Self::with_clock(logger, local_node_id, transport, RealClock)
    }
}

impl<C: Clock> PublishCoordinator<C> {
    pub fn with_clock(logger: slog::Logger, local_node_id: NodeId, transport: Arc<dyn NodeTransport>, clock: C) -> Self {
        PublishCoordinator {
            logger,
            local_node_id,
            transport,
            clock,
        }
    }

    pub fn local_node_id(&self) -> &NodeId {
        &self.local_node_id
    }

    /// Publishes `state` and decides the round's outcome. Delivery to every node keeps going after
    /// this returns; only the wait is bounded by `timeout`.
    pub async fn publish(&self, state: Arc<ClusterState>, timeout: Duration) -> PublishRound {
        let started_at = self.clock.now();
        let version = state.version();
        let logger = self.logger.new(slog::o!("Version" => version.as_u64()));

        let mut targets: BTreeSet<NodeId> = state.nodes().ids().cloned().collect();
        targets.insert(self.local_node_id.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        for node_id in targets.iter() {
            tokio::task::spawn(Self::deliver(
                logger.clone(),
                self.transport.clone(),
                node_id.clone(),
                state.clone(),
                tx.clone(),
            ));
        }
        // Channel closes once every delivery task has reported.
        drop(tx);

        let num_targets = targets.len();
        let mut tracker = AckTracker::new(version, targets);

        let outcome = if timeout == Duration::from_millis(0) {
            PublishOutcome::TimedOut
        } else {
            // A timeout too large to be a deadline means waiting until every node has replied.
            let deadline = started_at.checked_add(timeout);
            let mut clock = self.clock.clone();
            loop {
                tokio::select! {
                    biased;
                    reply = rx.recv() => match reply {
                        Some(reply) => {
                            if tracker.record(reply) == Recorded::Acked && tracker.all_acked() {
                                break PublishOutcome::Acknowledged;
                            }
                        }
                        None => {
                            slog::debug!(logger, "Every node replied but not all acked. Not waiting for timeout.");
                            break PublishOutcome::TimedOut;
                        }
                    },
                    _ = Self::sleep_until_deadline(&mut clock, deadline) => break PublishOutcome::TimedOut,
                }
            }
        };

        let round = tracker.finish(outcome, self.clock.now() - started_at);
        slog::info!(
            logger,
            "Publish round finished: {:?} (acked {}/{} after {:?}). Pending: {:?}",
            round.outcome,
            round.acked_nodes.len(),
            num_targets,
            round.elapsed,
            round.pending_nodes
        );

        if !round.pending_nodes.is_empty() {
            tokio::task::spawn(Self::log_late_replies(logger, rx));
        }

        round
    }

    async fn sleep_until_deadline(clock: &mut C, deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => clock.sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    async fn deliver(
        logger: slog::Logger,
        transport: Arc<dyn NodeTransport>,
        node_id: NodeId,
        state: Arc<ClusterState>,
        replies: mpsc::UnboundedSender<NodeReply>,
    ) {
        let result = transport.send_state(&node_id, state).await;
        if let Err(e) = &result {
            slog::warn!(logger, "Failed to publish to {}: {}", node_id, e);
        }

        // Receiver is gone once nobody is interested in late replies.
        let _ = replies.send(NodeReply { node_id, result });
    }

    async fn log_late_replies(logger: slog::Logger, mut rx: mpsc::UnboundedReceiver<NodeReply>) {
        while let Some(reply) = rx.recv().await {
            match reply.result {
                Ok(ack) => slog::debug!(logger, "Late ack from {} for version {}", reply.node_id, ack.version),
                Err(e) => slog::debug!(logger, "Late failure from {}: {}", reply.node_id, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ApplyAck;
    use crate::publish::time::mocked_clock;
    use crate::state::{DiscoveryNode, DiscoveryNodes, Version};
    use crate::transport::TransportError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Copy, Clone)]
    enum Script {
        Ack,
        Fail,
        Hang,
    }

    struct ScriptedTransport {
        scripts: HashMap<NodeId, Script>,
        delivered: Mutex<Vec<NodeId>>,
    }

    impl ScriptedTransport {
        fn new(scripts: &[(&str, Script)]) -> Arc<Self> {
            Arc::new(ScriptedTransport {
                scripts: scripts.iter().map(|(id, s)| (NodeId::new(*id), *s)).collect(),
                delivered: Mutex::new(Vec::new()),
            })
        }

        fn delivered(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl NodeTransport for ScriptedTransport {
        async fn send_state(&self, node_id: &NodeId, state: Arc<ClusterState>) -> Result<ApplyAck, TransportError> {
            self.delivered.lock().unwrap().push(node_id.clone());
            match self.scripts.get(node_id).copied().unwrap_or(Script::Ack) {
                Script::Ack => Ok(ApplyAck {
                    node_id: node_id.clone(),
                    version: state.version(),
                }),
                Script::Fail => Err(TransportError::Unreachable(node_id.clone())),
                Script::Hang => std::future::pending().await,
            }
        }
    }

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn state_with_nodes(ids: &[&str]) -> Arc<ClusterState> {
        let nodes = DiscoveryNodes::new(ids.iter().map(|id| DiscoveryNode::data_node(*id)));
        Arc::new(ClusterState::initial().next_version().nodes(nodes).build())
    }

    fn ids(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|id| NodeId::new(*id)).collect()
    }

    #[tokio::test]
    async fn all_nodes_ack() {
        let transport = ScriptedTransport::new(&[]);
        let coordinator = PublishCoordinator::new(logger(), NodeId::new("a"), transport.clone());

        let round = coordinator
            .publish(state_with_nodes(&["a", "b", "c"]), Duration::from_secs(30))
            .await;

        assert_eq!(round.outcome, PublishOutcome::Acknowledged);
        assert_eq!(round.version, Version::new(1));
        assert_eq!(round.acked_nodes, ids(&["a", "b", "c"]));
        assert!(round.pending_nodes.is_empty());
    }

    #[tokio::test]
    async fn unbounded_timeout_still_ends_when_all_nodes_ack() {
        let transport = ScriptedTransport::new(&[]);
        let coordinator = PublishCoordinator::new(logger(), NodeId::new("a"), transport);

        let round = coordinator
            .publish(state_with_nodes(&["a", "b", "c"]), Duration::MAX)
            .await;

        assert_eq!(round.outcome, PublishOutcome::Acknowledged);
        assert_eq!(round.acked_nodes, ids(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn unbounded_timeout_ends_early_when_a_node_fails() {
        let transport = ScriptedTransport::new(&[("c", Script::Fail)]);
        let coordinator = PublishCoordinator::new(logger(), NodeId::new("a"), transport);

        let round = coordinator
            .publish(state_with_nodes(&["a", "b", "c"]), Duration::MAX)
            .await;

        assert_eq!(round.outcome, PublishOutcome::TimedOut);
        assert!(round.failed_nodes.contains_key(&NodeId::new("c")));
    }

    #[tokio::test]
    async fn zero_timeout_never_waits_but_still_delivers() {
        let transport = ScriptedTransport::new(&[]);
        let coordinator = PublishCoordinator::new(logger(), NodeId::new("a"), transport.clone());

        let round = coordinator
            .publish(state_with_nodes(&["a", "b", "c"]), Duration::from_millis(0))
            .await;

        assert_eq!(round.outcome, PublishOutcome::TimedOut);
        assert!(round.acked_nodes.is_empty());
        assert_eq!(round.pending_nodes, ids(&["a", "b", "c"]));

        for _ in 0..100 {
            if transport.delivered() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(transport.delivered(), 3);
    }

    #[tokio::test]
    async fn local_node_is_always_a_target() {
        let transport = ScriptedTransport::new(&[]);
        let coordinator = PublishCoordinator::new(logger(), NodeId::new("master"), transport);

        let round = coordinator.publish(state_with_nodes(&["b"]), Duration::from_secs(30)).await;

        assert!(round.is_acknowledged());
        assert_eq!(round.acked_nodes, ids(&["b", "master"]));
    }

    #[tokio::test]
    async fn failed_node_ends_the_round_without_waiting_for_timeout() {
        let transport = ScriptedTransport::new(&[("c", Script::Fail)]);
        let (clock, _controller) = mocked_clock();
        let coordinator = PublishCoordinator::with_clock(logger(), NodeId::new("a"), transport, clock);

        // Mock time never moves, so only the early exit can finish this round.
        let round = coordinator
            .publish(state_with_nodes(&["a", "b", "c"]), Duration::from_secs(30))
            .await;

        assert_eq!(round.outcome, PublishOutcome::TimedOut);
        assert_eq!(round.acked_nodes, ids(&["a", "b"]));
        assert!(round.failed_nodes.contains_key(&NodeId::new("c")));
        assert_eq!(round.elapsed, Duration::from_millis(0));
    }

    #[tokio::test]
    async fn hanging_node_times_out_at_the_deadline() {
        let transport = ScriptedTransport::new(&[("c", Script::Hang)]);
        let (clock, mut controller) = mocked_clock();
        let coordinator = PublishCoordinator::with_clock(logger(), NodeId::new("a"), transport, clock);
        let timeout = Duration::from_secs(30);

        let handle = tokio::spawn(async move {
            coordinator
                .publish(state_with_nodes(&["a", "b", "c"]), timeout)
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            controller.advance(Duration::from_secs(1));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let round = handle.await.unwrap();

        assert_eq!(round.outcome, PublishOutcome::TimedOut);
        assert_eq!(round.acked_nodes, ids(&["a", "b"]));
        assert_eq!(round.pending_nodes, ids(&["c"]));
        assert!(round.elapsed >= timeout);
    }
}
