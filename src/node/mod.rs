mod applier;
mod apply_api;
mod local_state;

pub use applier::NodeApplier;
pub use apply_api::ApplyAck;
pub use apply_api::ApplyError;
pub use local_state::AppliedState;
pub use local_state::LocalStateReader;
