use crate::state::{DiscoveryNodes, NodeId, Settings, EXCLUDE_ID_SETTING, EXCLUDE_NAME_SETTING};
use std::collections::BTreeSet;

/// AllocationConstraint is the set of nodes that must not receive new shard copies. It is
/// always derived from the transient settings, never stored on its own.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AllocationConstraint {
    exclude_node_ids: BTreeSet<NodeId>,
}

impl AllocationConstraint {
    pub fn none() -> Self {
        AllocationConstraint::default()
    }

    pub fn excluding(node_ids: impl IntoIterator<Item = NodeId>) -> Self {
        AllocationConstraint {
            exclude_node_ids: node_ids.into_iter().collect(),
        }
    }

    /// Reads `exclude._id` and `exclude._name`. Names are resolved against `nodes`; a name that
    /// matches no member excludes nothing.
    pub fn from_settings(settings: &Settings, nodes: &DiscoveryNodes) -> Self {
        let mut exclude_node_ids: BTreeSet<NodeId> = settings
            .get_as_list(EXCLUDE_ID_SETTING)
            .into_iter()
            .map(NodeId::from)
            .collect();

        for name in settings.get_as_list(EXCLUDE_NAME_SETTING) {
            if let Some(node_id) = nodes.resolve_name(&name) {
                exclude_node_ids.insert(node_id.clone());
            }
        }

        AllocationConstraint { exclude_node_ids }
    }

    pub fn excludes(&self, node_id: &NodeId) -> bool {
        self.exclude_node_ids.contains(node_id)
    }

    pub fn exclude_node_ids(&self) -> &BTreeSet<NodeId> {
        &self.exclude_node_ids
    }

    pub fn is_empty(&self) -> bool {
        self.exclude_node_ids.is_empty()
    }
}
