use crate::node::{ApplyAck, ApplyError, NodeApplier};
use crate::state::ClusterState;
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
enum Event {
    // Stale: reject. Same version: re-ack or conflict. Newer: swap local state and ack.
    ApplyState(Arc<ClusterState>, Callback<ApplyAck, ApplyError>),
}

#[derive(Debug)]
struct Callback<O: Debug, E: Error>(oneshot::Sender<Result<O, E>>);

impl<O: Debug, E: Error> Callback<O, E> {
    pub fn send(self, message: Result<O, E>) {
        let _ = self.0.send(message);
    }
}

/// Receiving end of a node's event queue. Handed to `NodeActor::new`.
pub struct ActorQueue(mpsc::Receiver<Event>);

#[derive(Clone)]
pub struct ActorClient {
    sender: mpsc::Sender<Event>,
}

impl ActorClient {
    pub fn new(buffer_size: usize) -> (Self, ActorQueue) {
        let (tx, rx) = mpsc::channel(buffer_size);

        (ActorClient { sender: tx }, ActorQueue(rx))
    }

    /// A handle that doesn't keep the actor alive. Used by the transport so dropping a node's
    /// handle shuts its actor down.
    pub fn weak(&self) -> WeakActorClient {
        WeakActorClient {
            sender: self.sender.downgrade(),
        }
    }

    pub async fn apply_state(&self, state: Arc<ClusterState>) -> Result<ApplyAck, ApplyError> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::ApplyState(state, Callback(tx))).await?;

        rx.await.map_err(|_| ApplyError::ActorExited)?
    }

    async fn send(&self, event: Event) -> Result<(), ApplyError> {
        self.sender.send(event).await.map_err(|_| ApplyError::ActorExited)
    }
}

#[derive(Clone)]
pub struct WeakActorClient {
    sender: mpsc::WeakSender<Event>,
}

impl WeakActorClient {
    pub fn upgrade(&self) -> Option<ActorClient> {
        self.sender.upgrade().map(|sender| ActorClient { sender })
    }

    pub async fn apply_state(&self, state: Arc<ClusterState>) -> Result<ApplyAck, ApplyError> {
        match self.upgrade() {
            Some(client) => client.apply_state(state).await,
            None => Err(ApplyError::ActorExited),
        }
    }
}

/// NodeActor is the node applier in actor model: one queue per node, one event at a time.
pub struct NodeActor {
    logger: slog::Logger,
    receiver: mpsc::Receiver<Event>,
    applier: NodeApplier,
}

impl NodeActor {
    pub fn new(logger: slog::Logger, queue: ActorQueue, applier: NodeApplier) -> Self {
        NodeActor {
            logger,
            receiver: queue.0,
            applier,
        }
    }

    pub async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event);
        }
        slog::info!(self.logger, "Node actor for {} exiting. All clients dropped.", self.applier.node_id());
    }

    // This must NOT be async. Any long running work must be spawned on another task.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::ApplyState(state, callback) => {
                let result = self.applier.handle_apply(state);
                callback.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NodeId, Version};

    fn spawn_actor() -> (ActorClient, crate::node::LocalStateReader) {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let (applier, reader) = NodeApplier::new(logger.clone(), NodeId::new("node-1"));
        let (client, queue) = ActorClient::new(4);
        tokio::spawn(NodeActor::new(logger, queue, applier).run_event_loop());

        (client, reader)
    }

    #[tokio::test]
    async fn applies_through_the_queue() {
        let (client, reader) = spawn_actor();
        let v1 = Arc::new(ClusterState::initial().next_version().build());

        let ack = client.apply_state(v1).await.unwrap();

        assert_eq!(ack.version, Version::new(1));
        assert_eq!(reader.last_applied_version(), Version::new(1));
    }

    #[tokio::test]
    async fn weak_client_reports_exited_actor() {
        let (client, _reader) = spawn_actor();
        let weak = client.weak();
        let v1 = Arc::new(ClusterState::initial().next_version().build());
        assert!(weak.apply_state(v1.clone()).await.is_ok());

        drop(client);

        let err = weak.apply_state(v1).await.unwrap_err();
        assert_eq!(err, ApplyError::ActorExited);
        assert_eq!(err.to_string(), "node actor has exited");
    }
}
