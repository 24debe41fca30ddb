use crate::state::NodeId;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum CopyRole {
    Primary,
    Replica,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum ShardState {
    Unassigned,
    Initializing,
    Started,
    /// Copy is still on its current node and is moving to `relocating_node_id`. The data
    /// transfer happens outside of the cluster state.
    Relocating,
}

/// ShardId is `(index name, shard number)`.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ShardId {
    index: String,
    shard: u32,
}

impl ShardId {
    pub fn new(index: impl Into<String>, shard: u32) -> Self {
        ShardId {
            index: index.into(),
            shard,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn shard(&self) -> u32 {
        self.shard
    }
}

impl fmt::Debug for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.index, self.shard)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.index, self.shard)
    }
}

/// ShardRouting is the placement of a single shard copy.
///
/// Transitions (`initialize`, `start`, `relocate`, ...) return new values; the table that
/// contained the old value keeps it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardRouting {
    shard_id: ShardId,
    role: CopyRole,
    node_id: Option<NodeId>,
    state: ShardState,
    relocating_node_id: Option<NodeId>,
}

impl ShardRouting {
    pub fn unassigned(shard_id: ShardId, role: CopyRole) -> Self {
        ShardRouting {
            shard_id,
            role,
            node_id: None,
            state: ShardState::Unassigned,
            relocating_node_id: None,
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn role(&self) -> CopyRole {
        self.role
    }

    pub fn is_primary(&self) -> bool {
        self.role == CopyRole::Primary
    }

    pub fn node_id(&self) -> Option<&NodeId> {
        self.node_id.as_ref()
    }

    pub fn state(&self) -> ShardState {
        self.state
    }

    /// Destination of a relocating copy. `None` on a relocating copy means no destination has
    /// been found yet.
    pub fn relocating_node_id(&self) -> Option<&NodeId> {
        self.relocating_node_id.as_ref()
    }

    pub fn relocating(&self) -> bool {
        self.state == ShardState::Relocating
    }

    /// Started or relocating; the copy holds data and can serve.
    pub fn active(&self) -> bool {
        matches!(self.state, ShardState::Started | ShardState::Relocating)
    }

    pub fn assigned(&self) -> bool {
        self.node_id.is_some()
    }

    /// True if this copy lives on `node_id`, or is moving there.
    pub fn occupies(&self, node_id: &NodeId) -> bool {
        self.node_id.as_ref() == Some(node_id) || self.relocating_node_id.as_ref() == Some(node_id)
    }

    pub(crate) fn initialize(&self, node_id: NodeId) -> Self {
        ShardRouting {
            shard_id: self.shard_id.clone(),
            role: self.role,
            node_id: Some(node_id),
            state: ShardState::Initializing,
            relocating_node_id: None,
        }
    }

    pub(crate) fn start(&self) -> Self {
        ShardRouting {
            state: ShardState::Started,
            relocating_node_id: None,
            ..self.clone()
        }
    }

    pub(crate) fn relocate(&self, target: Option<NodeId>) -> Self {
        ShardRouting {
            state: ShardState::Relocating,
            relocating_node_id: target,
            ..self.clone()
        }
    }

    pub(crate) fn cancel_relocation(&self) -> Self {
        self.start()
    }

    /// The relocating copy has finished moving: it is now started on its destination.
    pub(crate) fn complete_relocation(&self) -> Option<Self> {
        let target = self.relocating_node_id.clone()?;
        Some(ShardRouting {
            shard_id: self.shard_id.clone(),
            role: self.role,
            node_id: Some(target),
            state: ShardState::Started,
            relocating_node_id: None,
        })
    }

    pub(crate) fn fail(&self) -> Self {
        ShardRouting::unassigned(self.shard_id.clone(), self.role)
    }

    pub(crate) fn with_role(&self, role: CopyRole) -> Self {
        ShardRouting { role, ..self.clone() }
    }
}

/// All copies of one shard. The primary, if the shard has one, is always first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardRoutingTable {
    shard_id: ShardId,
    copies: Vec<ShardRouting>,
}

impl ShardRoutingTable {
    fn new_unassigned(shard_id: ShardId, num_replicas: u32) -> Self {
        let mut copies = Vec::with_capacity(num_replicas as usize + 1);
        copies.push(ShardRouting::unassigned(shard_id.clone(), CopyRole::Primary));
        for _ in 0..num_replicas {
            copies.push(ShardRouting::unassigned(shard_id.clone(), CopyRole::Replica));
        }

        ShardRoutingTable { shard_id, copies }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn copies(&self) -> &[ShardRouting] {
        &self.copies
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardRouting> {
        self.copies.iter()
    }

    pub fn primary(&self) -> Option<&ShardRouting> {
        self.copies.iter().find(|c| c.is_primary())
    }

    pub fn primary_active(&self) -> bool {
        self.primary().map(|p| p.active()).unwrap_or(false)
    }

    pub fn replicas(&self) -> impl Iterator<Item = &ShardRouting> {
        self.copies.iter().filter(|c| !c.is_primary())
    }

    /// True if any copy of this shard lives on, or is moving to, `node_id`.
    pub fn occupies(&self, node_id: &NodeId) -> bool {
        self.copies.iter().any(|c| c.occupies(node_id))
    }

    pub(crate) fn copy_mut(&mut self, position: usize) -> &mut ShardRouting {
        &mut self.copies[position]
    }

    pub(crate) fn len(&self) -> usize {
        self.copies.len()
    }

    /// Re-establishes "primary first" after a promotion.
    pub(crate) fn sort_primary_first(&mut self) {
        self.copies.sort_by_key(|c| if c.is_primary() { 0 } else { 1 });
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexRoutingTable {
    index: String,
    shards: BTreeMap<u32, ShardRoutingTable>,
}

impl IndexRoutingTable {
    /// A freshly created index: every copy of every shard is unassigned.
    pub fn new_unassigned(index: impl Into<String>, num_shards: u32, num_replicas: u32) -> Self {
        let index = index.into();
        let shards = (0..num_shards)
            .map(|shard| {
                let shard_id = ShardId::new(index.clone(), shard);
                (shard, ShardRoutingTable::new_unassigned(shard_id, num_replicas))
            })
            .collect();

        IndexRoutingTable { index, shards }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn shard(&self, shard: u32) -> Option<&ShardRoutingTable> {
        self.shards.get(&shard)
    }

    pub fn shards(&self) -> impl Iterator<Item = &ShardRoutingTable> {
        self.shards.values()
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }
}

/// RoutingTable maps every index to the placement of its shard copies.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoutingTable {
    indices: BTreeMap<String, IndexRoutingTable>,
}

impl RoutingTable {
    pub fn empty() -> Self {
        RoutingTable::default()
    }

    pub fn index(&self, name: &str) -> Option<&IndexRoutingTable> {
        self.indices.get(name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn indices(&self) -> impl Iterator<Item = &IndexRoutingTable> {
        self.indices.values()
    }

    /// Returns a new table with `index` added (or replaced).
    pub fn with_index(&self, index: IndexRoutingTable) -> RoutingTable {
        let mut indices = self.indices.clone();
        indices.insert(index.index.clone(), index);
        RoutingTable { indices }
    }

    pub fn shard(&self, shard_id: &ShardId) -> Option<&ShardRoutingTable> {
        self.indices.get(shard_id.index()).and_then(|i| i.shard(shard_id.shard()))
    }

    /// Every shard of every index, ordered by (index name, shard number).
    pub fn shards(&self) -> impl Iterator<Item = &ShardRoutingTable> {
        self.indices.values().flat_map(|index| index.shards())
    }

    pub fn copies(&self) -> impl Iterator<Item = &ShardRouting> {
        self.shards().flat_map(|shard| shard.iter())
    }

    pub fn copies_on_node<'a>(&'a self, node_id: &NodeId) -> impl Iterator<Item = &'a ShardRouting> + 'a {
        let node_id = node_id.clone();
        self.copies().filter(move |c| c.node_id() == Some(&node_id))
    }

    /// Number of copies each node hosts. Relocation destinations count towards the destination.
    pub fn shards_per_node(&self) -> BTreeMap<NodeId, usize> {
        let mut counts = BTreeMap::new();
        for copy in self.copies() {
            if let Some(node_id) = copy.node_id() {
                *counts.entry(node_id.clone()).or_insert(0) += 1;
            }
            if let Some(target) = copy.relocating_node_id() {
                *counts.entry(target.clone()).or_insert(0) += 1;
            }
        }

        counts
    }

    pub fn has_relocating_shards(&self) -> bool {
        self.copies().any(|c| c.relocating())
    }

    /// Every copy is started; nothing is unassigned, initializing or moving.
    pub fn all_started(&self) -> bool {
        self.copies().all(|c| c.state() == ShardState::Started)
    }

    /// Shards that break the single-primary rule: more than one primary, or a shard whose
    /// primary was active at some point that no longer has exactly one active primary.
    ///
    /// A shard that has never been started (primary unassigned or initializing) is fine.
    pub fn single_primary_violations(&self) -> Vec<ShardId> {
        self.shards()
            .filter(|shard| {
                let primaries = shard.iter().filter(|c| c.is_primary()).count();
                let active_primaries = shard.iter().filter(|c| c.is_primary() && c.active()).count();
                let any_active = shard.iter().any(|c| c.active());
                primaries != 1 || (any_active && active_primaries != 1)
            })
            .map(|shard| shard.shard_id().clone())
            .collect()
    }

    pub(crate) fn shard_ids(&self) -> Vec<ShardId> {
        self.shards().map(|s| s.shard_id().clone()).collect()
    }

    pub(crate) fn shard_mut(&mut self, shard_id: &ShardId) -> Option<&mut ShardRoutingTable> {
        self.indices
            .get_mut(shard_id.index())
            .and_then(|i| i.shards.get_mut(&shard_id.shard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn new_index_is_all_unassigned_and_primary_first() {
        let index = IndexRoutingTable::new_unassigned("test", 3, 1);
        assert_eq!(index.num_shards(), 3);

        for shard in index.shards() {
            assert_eq!(shard.copies().len(), 2);
            assert!(shard.copies()[0].is_primary());
            assert!(!shard.copies()[1].is_primary());
            assert!(shard.iter().all(|c| c.state() == ShardState::Unassigned && !c.assigned()));
        }
    }

    #[test]
    fn copy_transitions() {
        let copy = ShardRouting::unassigned(ShardId::new("test", 0), CopyRole::Primary);

        let initializing = copy.initialize(node("a"));
        assert_eq!(initializing.state(), ShardState::Initializing);
        assert_eq!(initializing.node_id(), Some(&node("a")));

        let started = initializing.start();
        assert!(started.active());

        let relocating = started.relocate(Some(node("b")));
        assert!(relocating.relocating());
        assert!(relocating.occupies(&node("a")));
        assert!(relocating.occupies(&node("b")));

        let moved = relocating.complete_relocation().unwrap();
        assert_eq!(moved.state(), ShardState::Started);
        assert_eq!(moved.node_id(), Some(&node("b")));
        assert_eq!(moved.relocating_node_id(), None);
        assert!(moved.is_primary());

        // Unresolved destination can't complete.
        assert!(started.relocate(None).complete_relocation().is_none());
        assert_eq!(started.relocate(None).cancel_relocation(), started);
    }

    #[test]
    fn shards_per_node_counts_relocation_targets() {
        let shard_id = ShardId::new("test", 0);
        let mut table = RoutingTable::empty().with_index(IndexRoutingTable::new_unassigned("test", 1, 0));
        {
            let shard = table.shard_mut(&shard_id).unwrap();
            let copy = shard.copy_mut(0);
            *copy = copy.initialize(node("a")).start().relocate(Some(node("b")));
        }

        let counts = table.shards_per_node();
        assert_eq!(counts.get(&node("a")), Some(&1));
        assert_eq!(counts.get(&node("b")), Some(&1));
        assert!(table.has_relocating_shards());
        assert_eq!(table.copies_on_node(&node("a")).count(), 1);
        assert_eq!(table.copies_on_node(&node("b")).count(), 0);
    }

    #[test]
    fn copies_on_node_takes_a_temporary_id() {
        let shard_id = ShardId::new("test", 0);
        let mut table = RoutingTable::empty().with_index(IndexRoutingTable::new_unassigned("test", 1, 0));
        {
            let copy = table.shard_mut(&shard_id).unwrap().copy_mut(0);
            *copy = copy.initialize(node("a"));
        }

        let on_a: Vec<_> = table.copies_on_node(&node("a")).collect();
        assert_eq!(on_a.len(), 1);
        assert_eq!(on_a[0].shard_id(), &shard_id);
    }

    #[test]
    fn single_primary_violations() {
        let shard_id = ShardId::new("test", 0);
        let mut table = RoutingTable::empty().with_index(IndexRoutingTable::new_unassigned("test", 1, 1));
        assert!(table.single_primary_violations().is_empty());

        // Active replica with an unassigned primary breaks the rule.
        {
            let shard = table.shard_mut(&shard_id).unwrap();
            let replica = shard.copy_mut(1);
            *replica = replica.initialize(node("a")).start();
        }
        assert_eq!(table.single_primary_violations(), vec![shard_id.clone()]);

        // Two primaries breaks the rule.
        {
            let shard = table.shard_mut(&shard_id).unwrap();
            let replica = shard.copy_mut(1);
            *replica = replica.with_role(CopyRole::Primary);
        }
        assert_eq!(table.single_primary_violations(), vec![shard_id]);
    }
}
