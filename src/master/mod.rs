mod index_creation;
mod master_service;
mod settings_update;
mod shard_state;
#[cfg(test)]
mod test_utils;

pub use index_creation::CreateIndexError;
pub use index_creation::CreateIndexRequest;
pub use index_creation::CreateIndexResponse;
pub use master_service::MasterService;
pub use master_service::StateUpdateResult;
pub use settings_update::UpdateSettingsError;
pub use settings_update::UpdateTransientSettingsRequest;
pub use settings_update::UpdateTransientSettingsResponse;
pub use shard_state::RerouteResponse;
pub use shard_state::ShardStateResponse;
