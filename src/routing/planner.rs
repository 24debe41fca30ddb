use crate::routing::allocation::AllocationConstraint;
use crate::routing::routing_table::{CopyRole, RoutingTable, ShardId, ShardRoutingTable, ShardState};
use crate::state::{DiscoveryNodes, NodeId};
use std::collections::BTreeMap;

/// AllocationPlanner computes the next routing table from the current one, the membership
/// snapshot and the allocation constraint.
///
/// It is a pure function of its inputs. Every traversal is ordered (index name, shard number,
/// primary first) and every choice between nodes is "fewest copies, then lowest node id", so any
/// node that re-runs the planner on the same inputs gets the same table.
///
/// A pass, in order:
/// 1. Copies on nodes that left (or stopped holding data) are failed. A lost primary is replaced
///    by an active replica when there is one.
/// 2. Started copies on excluded nodes become relocating. Relocations whose destination is
///    missing or no longer valid are re-resolved, or cancelled if the source is no longer
///    excluded. Initializing copies on excluded nodes are reset.
/// 3. Unassigned primaries are allocated, then unassigned replicas of shards whose primary is
///    active.
pub struct AllocationPlanner;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AllocationReport {
    /// Copies newly marked relocating, with a destination.
    pub relocations_started: Vec<ShardId>,
    /// Copies left relocating with no feasible destination. They are retried on the next pass.
    pub unresolved_relocations: Vec<ShardId>,
    pub cancelled_relocations: Vec<ShardId>,
    pub initialized: Vec<ShardId>,
    pub failed: Vec<ShardId>,
    pub promoted: Vec<ShardId>,
    /// Copies that are still unassigned after this pass.
    pub unassigned: Vec<ShardId>,
}

impl AllocationReport {
    pub fn is_noop(&self) -> bool {
        self.relocations_started.is_empty()
            && self.cancelled_relocations.is_empty()
            && self.initialized.is_empty()
            && self.failed.is_empty()
            && self.promoted.is_empty()
    }
}

pub struct AllocationPlan {
    pub table: RoutingTable,
    pub report: AllocationReport,
}

impl AllocationPlanner {
    pub fn plan(current: &RoutingTable, nodes: &DiscoveryNodes, constraint: &AllocationConstraint) -> RoutingTable {
        Self::plan_detailed(current, nodes, constraint).table
    }

    pub fn plan_detailed(
        current: &RoutingTable,
        nodes: &DiscoveryNodes,
        constraint: &AllocationConstraint,
    ) -> AllocationPlan {
        let mut table = current.clone();
        let mut report = AllocationReport::default();
        let mut load = NodeLoad::new(&table);
        let shard_ids = table.shard_ids();

        for shard_id in shard_ids.iter() {
            if let Some(shard) = table.shard_mut(shard_id) {
                fail_departed_copies(shard, nodes, &mut load, &mut report);
            }
        }

        for shard_id in shard_ids.iter() {
            if let Some(shard) = table.shard_mut(shard_id) {
                move_off_excluded_nodes(shard, nodes, constraint, &mut load, &mut report);
            }
        }

        for shard_id in shard_ids.iter() {
            if let Some(shard) = table.shard_mut(shard_id) {
                allocate_unassigned(shard, CopyRole::Primary, nodes, constraint, &mut load, &mut report);
            }
        }
        for shard_id in shard_ids.iter() {
            if let Some(shard) = table.shard_mut(shard_id) {
                if shard.primary_active() {
                    allocate_unassigned(shard, CopyRole::Replica, nodes, constraint, &mut load, &mut report);
                } else {
                    report
                        .unassigned
                        .extend(shard.replicas().filter(|c| !c.assigned()).map(|c| c.shard_id().clone()));
                }
            }
        }

        AllocationPlan { table, report }
    }
}

/// Number of copies per node, including relocations targeting the node. Kept current as the
/// planner makes decisions so later shards see earlier choices.
struct NodeLoad {
    counts: BTreeMap<NodeId, usize>,
}

impl NodeLoad {
    fn new(table: &RoutingTable) -> Self {
        NodeLoad {
            counts: table.shards_per_node(),
        }
    }

    fn get(&self, node_id: &NodeId) -> usize {
        self.counts.get(node_id).copied().unwrap_or(0)
    }

    fn add(&mut self, node_id: &NodeId) {
        *self.counts.entry(node_id.clone()).or_insert(0) += 1;
    }

    fn remove(&mut self, node_id: &NodeId) {
        if let Some(count) = self.counts.get_mut(node_id) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Least loaded data node that is not excluded and holds no copy of this shard yet. Ties go to
/// the lowest node id.
fn pick_destination(
    shard: &ShardRoutingTable,
    nodes: &DiscoveryNodes,
    constraint: &AllocationConstraint,
    load: &NodeLoad,
) -> Option<NodeId> {
    nodes
        .data_nodes()
        .map(|n| n.id())
        .filter(|id| !constraint.excludes(id))
        .filter(|id| !shard.occupies(id))
        .min_by(|a, b| load.get(a).cmp(&load.get(b)).then_with(|| a.cmp(b)))
        .cloned()
}

fn fail_departed_copies(
    shard: &mut ShardRoutingTable,
    nodes: &DiscoveryNodes,
    load: &mut NodeLoad,
    report: &mut AllocationReport,
) {
    let shard_id = shard.shard_id().clone();
    let mut primary_lost = false;

    for position in 0..shard.len() {
        let copy = shard.copy_mut(position);

        if let Some(node_id) = copy.node_id().cloned() {
            if !nodes.is_data_node(&node_id) {
                load.remove(&node_id);
                if let Some(target) = copy.relocating_node_id() {
                    load.remove(target);
                }
                primary_lost |= copy.is_primary();
                *copy = copy.fail();
                report.failed.push(shard_id.clone());
                continue;
            }
        }

        if let Some(target) = copy.relocating_node_id().cloned() {
            if !nodes.is_data_node(&target) {
                load.remove(&target);
                *copy = copy.relocate(None);
            }
        }
    }

    if primary_lost && promote_active_replica(shard) {
        report.promoted.push(shard_id);
    }
}

/// Swaps roles between the (failed) primary and the first active replica.
fn promote_active_replica(shard: &mut ShardRoutingTable) -> bool {
    let replica_position = shard.iter().position(|c| !c.is_primary() && c.active());
    let primary_position = shard.iter().position(|c| c.is_primary());

    match (replica_position, primary_position) {
        (Some(replica_position), Some(primary_position)) => {
            let replica = shard.copy_mut(replica_position);
            *replica = replica.with_role(CopyRole::Primary);
            let old_primary = shard.copy_mut(primary_position);
            *old_primary = old_primary.with_role(CopyRole::Replica);
            shard.sort_primary_first();
            true
        }
        _ => false,
    }
}

fn move_off_excluded_nodes(
    shard: &mut ShardRoutingTable,
    nodes: &DiscoveryNodes,
    constraint: &AllocationConstraint,
    load: &mut NodeLoad,
    report: &mut AllocationReport,
) {
    let shard_id = shard.shard_id().clone();

    for position in 0..shard.len() {
        let current = shard.copies()[position].clone();
        let source_excluded = match current.node_id() {
            Some(node_id) => constraint.excludes(node_id),
            None => continue,
        };

        match current.state() {
            ShardState::Started if source_excluded => {
                let destination = pick_destination(shard, nodes, constraint, load);
                match destination.as_ref() {
                    Some(d) => {
                        load.add(d);
                        report.relocations_started.push(shard_id.clone());
                    }
                    None => report.unresolved_relocations.push(shard_id.clone()),
                }
                *shard.copy_mut(position) = current.relocate(destination);
            }
            ShardState::Relocating => {
                let destination_valid = current
                    .relocating_node_id()
                    .map(|d| nodes.is_data_node(d) && !constraint.excludes(d))
                    .unwrap_or(false);
                if destination_valid {
                    continue;
                }

                if let Some(old_destination) = current.relocating_node_id() {
                    load.remove(old_destination);
                }

                if source_excluded {
                    // Release the old destination first so it doesn't count as occupied.
                    *shard.copy_mut(position) = current.relocate(None);
                    let destination = pick_destination(shard, nodes, constraint, load);
                    match destination.as_ref() {
                        Some(d) => {
                            load.add(d);
                            report.relocations_started.push(shard_id.clone());
                        }
                        None => report.unresolved_relocations.push(shard_id.clone()),
                    }
                    *shard.copy_mut(position) = current.relocate(destination);
                } else {
                    *shard.copy_mut(position) = current.cancel_relocation();
                    report.cancelled_relocations.push(shard_id.clone());
                }
            }
            ShardState::Initializing if source_excluded => {
                if let Some(node_id) = current.node_id() {
                    load.remove(node_id);
                }
                *shard.copy_mut(position) = current.fail();
            }
            _ => {}
        }
    }
}

fn allocate_unassigned(
    shard: &mut ShardRoutingTable,
    role: CopyRole,
    nodes: &DiscoveryNodes,
    constraint: &AllocationConstraint,
    load: &mut NodeLoad,
    report: &mut AllocationReport,
) {
    for position in 0..shard.len() {
        let current = shard.copies()[position].clone();
        if current.role() != role || current.state() != ShardState::Unassigned {
            continue;
        }

        match pick_destination(shard, nodes, constraint, load) {
            Some(destination) => {
                load.add(&destination);
                *shard.copy_mut(position) = current.initialize(destination);
                report.initialized.push(current.shard_id().clone());
            }
            None => report.unassigned.push(current.shard_id().clone()),
        }
    }
}
