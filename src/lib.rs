mod actor;
mod api;
mod master;
mod membership;
mod node;
mod plugins;
mod publish;
mod routing;
mod state;
mod transport;

pub use api::try_create_local_cluster;
pub use api::ClusterAdminClient;
pub use api::ClusterCreationError;
pub use api::ClusterOptions;
pub use api::LocalCluster;
pub use api::LocalClusterConfig;
pub use api::MemberInfo;
pub use api::NodeHandle;
pub use api::TimeValue;
pub use api::TimeValueParseError;
pub use master::CreateIndexError;
pub use master::CreateIndexRequest;
pub use master::CreateIndexResponse;
pub use master::MasterService;
pub use master::RerouteResponse;
pub use master::ShardStateResponse;
pub use master::StateUpdateResult;
pub use master::UpdateSettingsError;
pub use master::UpdateTransientSettingsRequest;
pub use master::UpdateTransientSettingsResponse;
pub use membership::MembershipSource;
pub use membership::StaticMembership;
pub use node::AppliedState;
pub use node::ApplyAck;
pub use node::ApplyError;
pub use node::LocalStateReader;
pub use plugins::FilterParser;
pub use plugins::FilterParserFactory;
pub use plugins::IndexQueryParserService;
pub use plugins::ParseError;
pub use plugins::ParsedQuery;
pub use plugins::ParserContext;
pub use plugins::ParserModule;
pub use plugins::QueryParser;
pub use plugins::QueryParserFactory;
pub use plugins::RegistryError;
pub use publish::Clock;
pub use publish::PublishCoordinator;
pub use publish::PublishOutcome;
pub use publish::PublishRound;
pub use publish::RealClock;
pub use routing::AllocationConstraint;
pub use routing::AllocationPlan;
pub use routing::AllocationPlanner;
pub use routing::AllocationReport;
pub use routing::CopyRole;
pub use routing::IndexRoutingTable;
pub use routing::RoutingTable;
pub use routing::ShardEvent;
pub use routing::ShardEventError;
pub use routing::ShardId;
pub use routing::ShardRouting;
pub use routing::ShardRoutingTable;
pub use routing::ShardState;
pub use routing::apply_shard_events;
pub use routing::completion_events_for_relocations;
pub use routing::started_events_for_initializing;
pub use state::ClusterState;
pub use state::ClusterStateBuilder;
pub use state::DiscoveryNode;
pub use state::DiscoveryNodes;
pub use state::NodeId;
pub use state::Settings;
pub use state::Version;
pub use state::EXCLUDE_ID_SETTING;
pub use state::EXCLUDE_NAME_SETTING;
pub use transport::LinkFault;
pub use transport::LocalTransport;
pub use transport::NodeTransport;
pub use transport::TransportError;

// `crate::{root_mod}` holds no code, only `mod` and `pub use` statements. No `mod` is `pub`;
// everything public is exported through an individual `pub use`, so each module's layout stays
// its own business.
