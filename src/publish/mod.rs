mod ack_tracker;
mod coordinator;
mod time;

pub use ack_tracker::PublishOutcome;
pub use ack_tracker::PublishRound;
pub use coordinator::PublishCoordinator;
pub use time::Clock;
pub use time::RealClock;
