use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Default)]
pub struct ClusterOptions {
    /// Ack timeout for requests that don't set their own.
    pub default_ack_timeout: Option<Duration>,
    pub node_event_queue_size: Option<usize>,
}

pub(super) struct ClusterOptionsValidated {
    pub default_ack_timeout: Duration,
    pub node_event_queue_size: usize,
}

impl ClusterOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.default_ack_timeout > Duration::from_secs(60 * 60) {
            return Err("Default ack timeout must be at most 1 hour");
        }
        if self.node_event_queue_size == 0 {
            return Err("Node event queue size must be at least 1");
        }

        Ok(())
    }
}

impl TryFrom<ClusterOptions> for ClusterOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ClusterOptions) -> Result<Self, Self::Error> {
        let values = ClusterOptionsValidated {
            default_ack_timeout: options.default_ack_timeout.unwrap_or(Duration::from_secs(30)),
            node_event_queue_size: options.node_event_queue_size.unwrap_or(64),
        };

        values.validate()?;
        Ok(values)
    }
}
