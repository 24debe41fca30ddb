use tokio::time::Instant;

/// Clock tells a publish round what time it is and parks it until the ack deadline. Tests use the
/// mock to decide exactly when a deadline passes.
#[async_trait::async_trait]
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Resolves once `now() >= deadline`.
    async fn sleep_until(&mut self, deadline: Instant);
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
pub(crate) use mock::mocked_clock;

#[cfg(test)]
mod mock {
    use super::Clock;
    use tokio::sync::watch;
    use tokio::time::{Duration, Instant};

    pub(crate) fn mocked_clock() -> (MockClock, MockClockController) {
        let now = Instant::now();
        let (tx, rx) = watch::channel(now);
        let clock = MockClock { current_time: rx };
        let controller = MockClockController {
            current_time: tx,
            time_of_instantiation: now,
        };

        (clock, controller)
    }

    #[derive(Clone)]
    pub(crate) struct MockClock {
        current_time: watch::Receiver<Instant>,
    }

    #[async_trait::async_trait]
    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current_time.borrow()
        }

        async fn sleep_until(&mut self, deadline: Instant) {
            loop {
                if *self.current_time.borrow() >= deadline {
                    return;
                }

                self.current_time.changed().await.expect("Controller dropped");
            }
        }
    }

    pub(crate) struct MockClockController {
        current_time: watch::Sender<Instant>,
        time_of_instantiation: Instant,
    }

    impl MockClockController {
        pub(crate) fn current_time(&self) -> Instant {
            *self.current_time.borrow()
        }

        pub(crate) fn elapsed_time(&self) -> Duration {
            self.current_time() - self.time_of_instantiation
        }

        /// Moves mock time forward, waking any round whose ack deadline is now behind us.
        pub(crate) fn advance(&mut self, duration: Duration) {
            let new_now = *self.current_time.borrow() + duration;
            self.current_time.send_replace(new_now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[tokio::test]
    async fn ack_deadline_passes_only_when_mock_time_reaches_it() {
        let ack_timeout = Duration::from_secs(30);
        let (mut clock, mut controller) = mocked_clock();
        let deadline = controller.current_time() + ack_timeout;

        let waiter = tokio::spawn(async move {
            clock.sleep_until(deadline).await;
        });

        // Just short of the deadline: the round is still waiting for acks.
        controller.advance(ack_timeout - Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        controller.advance(Duration::from_millis(1));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("deadline reached")
            .unwrap();
        assert_eq!(controller.elapsed_time(), ack_timeout);
    }

    #[tokio::test]
    async fn past_deadline_does_not_wait() {
        let (mut clock, controller) = mocked_clock();
        let deadline = controller.current_time();

        tokio::time::timeout(Duration::from_secs(1), clock.sleep_until(deadline))
            .await
            .expect("deadline already passed");
    }
}
