use crate::routing::RoutingTable;
use crate::state::nodes::{DiscoveryNodes, NodeId};
use crate::state::settings::Settings;
use std::fmt;
use std::sync::Arc;

/// Version of a cluster state. Only the master creates new versions, always as `previous + 1`.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version(u64);

impl Version {
    pub fn new(version: u64) -> Self {
        Version(version)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ClusterState is an immutable snapshot of cluster metadata plus the routing table. It is
/// always shared behind an `Arc`; a new version is built from the previous one and never
/// touches the previous one's contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterState {
    version: Version,
    master_node_id: Option<NodeId>,
    nodes: DiscoveryNodes,
    transient_settings: Settings,
    routing_table: Arc<RoutingTable>,
}

impl ClusterState {
    /// The state every node boots with, before the master has published anything.
    pub fn initial() -> Self {
        ClusterState {
            version: Version::new(0),
            master_node_id: None,
            nodes: DiscoveryNodes::default(),
            transient_settings: Settings::empty(),
            routing_table: Arc::new(RoutingTable::empty()),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn master_node_id(&self) -> Option<&NodeId> {
        self.master_node_id.as_ref()
    }

    pub fn nodes(&self) -> &DiscoveryNodes {
        &self.nodes
    }

    pub fn transient_settings(&self) -> &Settings {
        &self.transient_settings
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    #[cfg(test)]
    pub(crate) fn shared_routing_table(&self) -> Arc<RoutingTable> {
        self.routing_table.clone()
    }

    /// Starts building the version that follows this one. Anything not overridden on the
    /// builder is carried forward unchanged.
    pub fn next_version(&self) -> ClusterStateBuilder {
        ClusterStateBuilder {
            version: self.version.next(),
            master_node_id: self.master_node_id.clone(),
            nodes: self.nodes.clone(),
            transient_settings: self.transient_settings.clone(),
            routing_table: self.routing_table.clone(),
        }
    }
}

pub struct ClusterStateBuilder {
    version: Version,
    master_node_id: Option<NodeId>,
    nodes: DiscoveryNodes,
    transient_settings: Settings,
    routing_table: Arc<RoutingTable>,
}

impl ClusterStateBuilder {
    pub fn master_node_id(mut self, master_node_id: NodeId) -> Self {
        self.master_node_id = Some(master_node_id);
        self
    }

    pub fn nodes(mut self, nodes: DiscoveryNodes) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn transient_settings(mut self, transient_settings: Settings) -> Self {
        self.transient_settings = transient_settings;
        self
    }

    pub fn routing_table(mut self, routing_table: RoutingTable) -> Self {
        self.routing_table = Arc::new(routing_table);
        self
    }

    pub fn build(self) -> ClusterState {
        ClusterState {
            version: self.version,
            master_node_id: self.master_node_id,
            nodes: self.nodes,
            transient_settings: self.transient_settings,
            routing_table: self.routing_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::IndexRoutingTable;
    use crate::state::nodes::DiscoveryNode;
    use std::collections::BTreeMap;

    #[test]
    fn next_version_carries_everything_forward() {
        let v1 = ClusterState::initial()
            .next_version()
            .nodes(DiscoveryNodes::new(vec![DiscoveryNode::data_node("node-1")]))
            .transient_settings(Settings::from(
                vec![("k".to_string(), "v".to_string())]
                    .into_iter()
                    .collect::<BTreeMap<_, _>>(),
            ))
            .routing_table(RoutingTable::empty().with_index(IndexRoutingTable::new_unassigned("test", 2, 0)))
            .build();
        assert_eq!(v1.version(), Version::new(1));

        let v2 = v1.next_version().build();
        assert_eq!(v2.version(), Version::new(2));
        assert_eq!(v2.nodes(), v1.nodes());
        assert_eq!(v2.transient_settings(), v1.transient_settings());
        assert!(Arc::ptr_eq(&v2.shared_routing_table(), &v1.shared_routing_table()));
    }

    #[test]
    fn new_routing_table_does_not_touch_previous_version() {
        let v1 = ClusterState::initial()
            .next_version()
            .routing_table(RoutingTable::empty().with_index(IndexRoutingTable::new_unassigned("a", 1, 0)))
            .build();
        let v2 = v1
            .next_version()
            .routing_table(v1.routing_table().with_index(IndexRoutingTable::new_unassigned("b", 1, 0)))
            .build();

        assert!(v1.routing_table().index("b").is_none());
        assert!(v2.routing_table().index("a").is_some());
        assert!(v2.routing_table().index("b").is_some());
        assert_ne!(v1, v2);
    }
}
