//! Realtime change feed
//!
//! A `Subscription` is a lazy, infinite, non-restartable stream of change
//! events for one entity kind. Whoever produces the events hands the
//! subscription its sending task; dropping or unsubscribing stops it.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::entities::{EntityId, EntityKind, EntitySnapshot};

/// A change pushed by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Record created or changed
    Upserted(EntitySnapshot),
    /// Record deleted
    Removed { kind: EntityKind, id: EntityId },
}

impl ChangeEvent {
    pub fn id(&self) -> &EntityId {
        match self {
            ChangeEvent::Upserted(snapshot) => &snapshot.id,
            ChangeEvent::Removed { id, .. } => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ChangeEvent::Upserted(snapshot) => snapshot.kind,
            ChangeEvent::Removed { kind, .. } => *kind,
        }
    }
}

/// Handle on an open change feed
pub struct Subscription {
    kind: EntityKind,
    events: mpsc::Receiver<ChangeEvent>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Create a subscription and the sender that feeds it
    pub fn channel(kind: EntityKind, capacity: usize) -> (mpsc::Sender<ChangeEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let subscription = Self {
            kind,
            events: rx,
            producer: None,
        };
        (tx, subscription)
    }

    /// Tie a producing task to this subscription; it is aborted on release
    pub fn with_producer(mut self, producer: JoinHandle<()>) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Wait for the next event. `None` means the feed is closed for good.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Release the feed and its producer
    pub fn unsubscribe(self) {
        tracing::debug!(kind = %self.kind, "Unsubscribing from change feed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("has_producer", &self.producer.is_some())
            .finish()
    }
}
