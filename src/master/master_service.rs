use crate::membership::MembershipSource;
use crate::publish::{Clock, PublishCoordinator, PublishRound, RealClock};
use crate::state::{ClusterState, ClusterStateBuilder, DiscoveryNodes, NodeId};
use crate::transport::NodeTransport;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

/// Result of one state update: the state that was published and how the round went.
#[derive(Clone, Debug)]
pub struct StateUpdateResult {
    pub state: Arc<ClusterState>,
    pub round: PublishRound,
}

/// MasterService owns the cluster state on the master node. Every change goes through
/// `submit_state_update`, which holds a lock for the whole round, so versions are handed out one
/// at a time and rounds never overlap.
pub struct MasterService<C: Clock = RealClock> {
    logger: slog::Logger,
    coordinator: PublishCoordinator<C>,
    membership: Arc<dyn MembershipSource>,
    default_ack_timeout: Duration,
    // Last *published* state, not necessarily acked by everyone.
    last_published: Mutex<Arc<ClusterState>>,
}

impl MasterService {
    pub fn new(
        logger: slog::Logger,
        node_id: NodeId,
        transport: Arc<dyn NodeTransport>,
        membership: Arc<dyn MembershipSource>,
        default_ack_timeout: Duration,
    ) -> Self {
        let coordinator = PublishCoordinator::new(logger.clone(), node_id, transport);
        Self::with_coordinator(logger, coordinator, membership, default_ack_timeout)
    }
}

impl<C: Clock> MasterService<C> {
    pub fn with_coordinator(
        logger: slog::Logger,
        coordinator: PublishCoordinator<C>,
        membership: Arc<dyn MembershipSource>,
        default_ack_timeout: Duration,
    ) -> Self {
        MasterService {
            logger,
            coordinator,
            membership,
            default_ack_timeout,
            last_published: Mutex::new(Arc::new(ClusterState::initial())),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        self.coordinator.local_node_id()
    }

    pub fn default_ack_timeout(&self) -> Duration {
        self.default_ack_timeout
    }

    /// The last state this master published. Waits for an in-flight round to finish.
    pub async fn state(&self) -> Arc<ClusterState> {
        self.last_published.lock().await.clone()
    }

    /// Builds the next state with `update` and publishes it.
    ///
    /// `update` gets the last published state and a fresh membership snapshot. The published state
    /// always carries that snapshot and this node as master. If `update` fails nothing is
    /// published. Once published, the new state is the base for the next update whatever the
    /// round's outcome: nodes that missed it catch up on the next version.
    pub async fn submit_state_update<F, E>(
        &self,
        source: &str,
        timeout: Duration,
        update: F,
    ) -> Result<StateUpdateResult, E>
    where
        F: FnOnce(&ClusterState, &DiscoveryNodes) -> Result<ClusterStateBuilder, E>,
    {
        let mut last_published = self.last_published.lock().await;
        let nodes = self.membership.current_nodes();

        let new_state = update(&last_published, &nodes)?
            .nodes(nodes)
            .master_node_id(self.node_id().clone())
            .build();
        let new_state = Arc::new(new_state);
        slog::info!(
            self.logger,
            "Publishing version {} for [{}] with timeout {:?}",
            new_state.version(),
            source,
            timeout
        );

        *last_published = new_state.clone();
        let round = self.coordinator.publish(new_state.clone(), timeout).await;

        Ok(StateUpdateResult { state: new_state, round })
    }

    pub(super) async fn submit_infallible<F>(&self, source: &str, timeout: Duration, update: F) -> StateUpdateResult
    where
        F: FnOnce(&ClusterState, &DiscoveryNodes) -> ClusterStateBuilder,
    {
        let result = self
            .submit_state_update(source, timeout, |state, nodes| Ok::<_, Infallible>(update(state, nodes)))
            .await;

        match result {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    pub(super) fn logger(&self) -> &slog::Logger {
        &self.logger
    }

    pub(super) fn ack_timeout(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_ack_timeout)
    }
}
