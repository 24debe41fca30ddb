use crate::routing::routing_table::{RoutingTable, ShardId, ShardState};
use crate::state::NodeId;

/// ShardEvent is a report, made out-of-band by the node holding a copy, that the copy has made
/// progress. The master folds these into the next routing table it publishes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShardEvent {
    /// An initializing copy on `node_id` has recovered and can serve.
    Started { shard_id: ShardId, node_id: NodeId },
    /// The copy relocating away from `source_node_id` has finished moving to its destination.
    RelocationCompleted { shard_id: ShardId, source_node_id: NodeId },
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ShardEventError {
    #[error("shard {0} does not exist")]
    UnknownShard(ShardId),
    #[error("no initializing copy of {shard_id} on node {node_id}")]
    NoInitializingCopy { shard_id: ShardId, node_id: NodeId },
    #[error("no relocating copy of {shard_id} leaving node {node_id} with a known destination")]
    NoRelocatingCopy { shard_id: ShardId, node_id: NodeId },
}

/// Returns a new table with `events` applied in order. Events that don't match the table are
/// skipped and returned as errors; the rest still apply.
pub fn apply_shard_events(table: &RoutingTable, events: &[ShardEvent]) -> (RoutingTable, Vec<ShardEventError>) {
    let mut updated = table.clone();
    let mut rejected = Vec::new();

    for event in events {
        if let Err(e) = apply_one(&mut updated, event) {
            rejected.push(e);
        }
    }

    (updated, rejected)
}

fn apply_one(table: &mut RoutingTable, event: &ShardEvent) -> Result<(), ShardEventError> {
    match event {
        ShardEvent::Started { shard_id, node_id } => {
            let shard = table
                .shard_mut(shard_id)
                .ok_or_else(|| ShardEventError::UnknownShard(shard_id.clone()))?;
            let position = shard
                .iter()
                .position(|c| c.state() == ShardState::Initializing && c.node_id() == Some(node_id))
                .ok_or_else(|| ShardEventError::NoInitializingCopy {
                    shard_id: shard_id.clone(),
                    node_id: node_id.clone(),
                })?;

            let copy = shard.copy_mut(position);
            *copy = copy.start();
            Ok(())
        }
        ShardEvent::RelocationCompleted {
            shard_id,
            source_node_id,
        } => {
            let no_match = || ShardEventError::NoRelocatingCopy {
                shard_id: shard_id.clone(),
                node_id: source_node_id.clone(),
            };
            let shard = table
                .shard_mut(shard_id)
                .ok_or_else(|| ShardEventError::UnknownShard(shard_id.clone()))?;
            let position = shard
                .iter()
                .position(|c| c.relocating() && c.node_id() == Some(source_node_id))
                .ok_or_else(no_match)?;

            let copy = shard.copy_mut(position);
            let moved = copy.complete_relocation().ok_or_else(no_match)?;
            *copy = moved;
            Ok(())
        }
    }
}

/// A `Started` event for every initializing copy in the table.
pub fn started_events_for_initializing(table: &RoutingTable) -> Vec<ShardEvent> {
    table
        .copies()
        .filter(|c| c.state() == ShardState::Initializing)
        .filter_map(|c| {
            c.node_id().map(|node_id| ShardEvent::Started {
                shard_id: c.shard_id().clone(),
                node_id: node_id.clone(),
            })
        })
        .collect()
}

/// A `RelocationCompleted` event for every relocation that has a destination.
pub fn completion_events_for_relocations(table: &RoutingTable) -> Vec<ShardEvent> {
    table
        .copies()
        .filter(|c| c.relocating() && c.relocating_node_id().is_some())
        .filter_map(|c| {
            c.node_id().map(|node_id| ShardEvent::RelocationCompleted {
                shard_id: c.shard_id().clone(),
                source_node_id: node_id.clone(),
            })
        })
        .collect()
}
