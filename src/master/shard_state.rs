use crate::master::master_service::StateUpdateResult;
use crate::master::MasterService;
use crate::publish::Clock;
use crate::routing::{
    apply_shard_events, completion_events_for_relocations, started_events_for_initializing, AllocationConstraint,
    AllocationPlanner, AllocationReport, RoutingTable, ShardEvent, ShardEventError,
};
use crate::state::{DiscoveryNodes, Settings, Version};
use tokio::time::Duration;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardStateResponse {
    pub acknowledged: bool,
    pub version: Version,
    /// Events that matched the routing table and were applied.
    pub applied: usize,
    pub rejected: Vec<ShardEventError>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RerouteResponse {
    pub acknowledged: bool,
    pub version: Version,
    pub report: AllocationReport,
}

impl<C: Clock> MasterService<C> {
    /// Applies shard progress reported by nodes, re-plans and publishes. Events that don't match
    /// the current table are skipped and returned in the response.
    pub async fn shards_started(&self, events: Vec<ShardEvent>, timeout: Option<Duration>) -> ShardStateResponse {
        self.publish_shard_events("shards-started", timeout, move |_| events).await
    }

    /// Reports every initializing copy as started. Stands in for recovery finishing on each node.
    pub async fn start_initializing_shards(&self, timeout: Option<Duration>) -> ShardStateResponse {
        self.publish_shard_events("start-initializing-shards", timeout, started_events_for_initializing)
            .await
    }

    /// Reports every relocation that has a destination as done. Stands in for the data move.
    pub async fn complete_relocations(&self, timeout: Option<Duration>) -> ShardStateResponse {
        self.publish_shard_events("complete-relocations", timeout, completion_events_for_relocations)
            .await
    }

    /// Re-plans against the current membership and publishes, e.g. after nodes joined or left.
    pub async fn reroute(&self, timeout: Option<Duration>) -> RerouteResponse {
        let mut report = AllocationReport::default();
        let result = self
            .submit_infallible("reroute", self.ack_timeout(timeout), |current, nodes| {
                let plan = AllocationPlanner::plan_detailed(
                    current.routing_table(),
                    nodes,
                    &constraint(current.transient_settings(), nodes),
                );
                report = plan.report;
                current.next_version().routing_table(plan.table)
            })
            .await;

        RerouteResponse {
            acknowledged: result.round.is_acknowledged(),
            version: result.state.version(),
            report,
        }
    }

    async fn publish_shard_events<F>(&self, source: &str, timeout: Option<Duration>, events: F) -> ShardStateResponse
    where
        F: FnOnce(&RoutingTable) -> Vec<ShardEvent>,
    {
        let mut applied = 0;
        let mut rejected = Vec::new();

        let StateUpdateResult { state, round } = self
            .submit_infallible(source, self.ack_timeout(timeout), |current, nodes| {
                let events = events(current.routing_table());
                let (table, errors) = apply_shard_events(current.routing_table(), &events);
                applied = events.len() - errors.len();
                rejected = errors;

                let table = AllocationPlanner::plan(&table, nodes, &constraint(current.transient_settings(), nodes));
                current.next_version().routing_table(table)
            })
            .await;

        if !rejected.is_empty() {
            slog::warn!(self.logger(), "Skipped {} shard events: {:?}", rejected.len(), rejected);
        }

        ShardStateResponse {
            acknowledged: round.is_acknowledged(),
            version: state.version(),
            applied,
            rejected,
        }
    }
}

fn constraint(settings: &Settings, nodes: &DiscoveryNodes) -> AllocationConstraint {
    AllocationConstraint::from_settings(settings, nodes)
}
