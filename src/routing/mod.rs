mod allocation;
mod planner;
mod routing_table;
mod shard_events;

pub use allocation::AllocationConstraint;
pub use planner::AllocationPlan;
pub use planner::AllocationPlanner;
pub use planner::AllocationReport;
pub use routing_table::CopyRole;
pub use routing_table::IndexRoutingTable;
pub use routing_table::RoutingTable;
pub use routing_table::ShardId;
pub use routing_table::ShardRouting;
pub use routing_table::ShardRoutingTable;
pub use routing_table::ShardState;
pub use shard_events::apply_shard_events;
pub use shard_events::completion_events_for_relocations;
pub use shard_events::started_events_for_initializing;
pub use shard_events::ShardEvent;
pub use shard_events::ShardEventError;
