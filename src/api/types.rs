use crate::state::DiscoveryNode;

#[derive(Clone, Debug)]
pub struct MemberInfo {
    pub node_id: String,
    pub name: String,
    /// Whether the node can hold shard copies.
    pub data: bool,
}

impl MemberInfo {
    /// A data node named after its id.
    pub fn data_node(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        MemberInfo {
            name: node_id.clone(),
            node_id,
            data: true,
        }
    }
}

impl From<MemberInfo> for DiscoveryNode {
    fn from(member_info: MemberInfo) -> Self {
        DiscoveryNode::new(member_info.node_id, member_info.name, member_info.data)
    }
}
