use crate::state::{DiscoveryNode, DiscoveryNodes, NodeId};
use std::sync::{Arc, RwLock};

/// MembershipSource tells the master which nodes are currently in the cluster. It is queried at
/// the start of every publish round.
pub trait MembershipSource: Send + Sync {
    fn current_nodes(&self) -> DiscoveryNodes;
}

/// StaticMembership is a membership list that only changes when told to.
#[derive(Clone, Default)]
pub struct StaticMembership {
    nodes: Arc<RwLock<DiscoveryNodes>>,
}

impl StaticMembership {
    pub fn new(nodes: DiscoveryNodes) -> Self {
        StaticMembership {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Returns the previous entry for the node, if it was already a member.
    pub fn add(&self, node: DiscoveryNode) -> Option<DiscoveryNode> {
        self.nodes.write().expect("Membership lock poisoned").insert(node)
    }

    pub fn remove(&self, node_id: &NodeId) -> Option<DiscoveryNode> {
        self.nodes.write().expect("Membership lock poisoned").remove(node_id)
    }
}

impl MembershipSource for StaticMembership {
    fn current_nodes(&self) -> DiscoveryNodes {
        self.nodes.read().expect("Membership lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_are_visible_to_every_clone() {
        let membership = StaticMembership::new(DiscoveryNodes::new(vec![DiscoveryNode::data_node("a")]));
        let shared = membership.clone();

        assert!(shared.add(DiscoveryNode::data_node("b")).is_none());
        assert!(membership.remove(&NodeId::new("a")).is_some());

        let ids: Vec<_> = membership.current_nodes().ids().cloned().collect();
        assert_eq!(ids, vec![NodeId::new("b")]);
    }
}
