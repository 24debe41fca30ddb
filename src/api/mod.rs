//! This mod is meant to hold most of the code for the library's client-facing API.
mod cluster;
mod options;
mod time_value;
mod types;
mod wiring;

pub use cluster::ClusterAdminClient;
pub use cluster::LocalCluster;
pub use cluster::NodeHandle;
pub use options::ClusterOptions;
pub use time_value::TimeValue;
pub use time_value::TimeValueParseError;
pub use types::MemberInfo;
pub use wiring::try_create_local_cluster;
pub use wiring::ClusterCreationError;
pub use wiring::LocalClusterConfig;
