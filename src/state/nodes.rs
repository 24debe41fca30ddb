use std::collections::BTreeMap;
use std::fmt;

/// NodeId identifies a cluster member. Ordering is lexicographic, which is what every
/// deterministic traversal in this crate (allocation, publish fan-out logs) relies on.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// DiscoveryNode is what the membership source tells us about a single member.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryNode {
    id: NodeId,
    name: String,
    data: bool,
}

impl DiscoveryNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, data: bool) -> Self {
        DiscoveryNode {
            id: id.into(),
            name: name.into(),
            data,
        }
    }

    /// A data-capable node whose name is the same as its id.
    pub fn data_node(id: impl Into<String>) -> Self {
        let id = id.into();
        DiscoveryNode::new(NodeId::new(id.clone()), id, true)
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_data(&self) -> bool {
        self.data
    }
}

/// DiscoveryNodes is a point-in-time membership snapshot, keyed and iterated by node id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoveryNodes {
    nodes: BTreeMap<NodeId, DiscoveryNode>,
}

impl DiscoveryNodes {
    pub fn new(nodes: impl IntoIterator<Item = DiscoveryNode>) -> Self {
        DiscoveryNodes {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&DiscoveryNode> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// True if the node is a member and may host shard copies.
    pub fn is_data_node(&self, node_id: &NodeId) -> bool {
        self.nodes.get(node_id).map(|n| n.data).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveryNode> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn data_nodes(&self) -> impl Iterator<Item = &DiscoveryNode> {
        self.nodes.values().filter(|n| n.data)
    }

    pub fn resolve_name(&self, name: &str) -> Option<&NodeId> {
        self.nodes.values().find(|n| n.name == name).map(|n| &n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, node: DiscoveryNode) -> Option<DiscoveryNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub(crate) fn remove(&mut self, node_id: &NodeId) -> Option<DiscoveryNode> {
        self.nodes.remove(node_id)
    }
}
