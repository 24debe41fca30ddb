mod cluster_state;
mod nodes;
mod settings;

pub use cluster_state::ClusterState;
pub use cluster_state::ClusterStateBuilder;
pub use cluster_state::Version;
pub use nodes::DiscoveryNode;
pub use nodes::DiscoveryNodes;
pub use nodes::NodeId;
pub use settings::Settings;
pub use settings::EXCLUDE_ID_SETTING;
pub use settings::EXCLUDE_NAME_SETTING;
