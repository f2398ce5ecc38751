//! Events crossing widget boundaries and the publish/subscribe bus that carries them.

use std::fmt;

use shared::domain::{Product, ProductDraft, ProductId, User};
use tokio::sync::broadcast;
use tracing::debug;

/// Names under which events are published, as seen by orchestration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AuthSuccess,
    AuthLogout,
    ItemCreate,
    ItemEdit,
    ItemDelete,
    SessionUnauthenticated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::AuthSuccess => "auth-success",
            EventKind::AuthLogout => "auth-logout",
            EventKind::ItemCreate => "item-create",
            EventKind::ItemEdit => "item-edit",
            EventKind::ItemDelete => "item-delete",
            EventKind::SessionUnauthenticated => "session-unauthenticated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait BusEvent: Clone + Send + 'static {
    fn kind(&self) -> EventKind;
}

/// Outcome of the auth widget, consumed by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    Success { user: User },
    Logout,
}

impl BusEvent for AuthEvent {
    fn kind(&self) -> EventKind {
        match self {
            AuthEvent::Success { .. } => EventKind::AuthSuccess,
            AuthEvent::Logout => EventKind::AuthLogout,
        }
    }
}

/// User-initiated change to server data, not yet confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    Create { item: ProductDraft },
    Edit { item: Product },
    Delete { id: ProductId },
}

impl BusEvent for MutationIntent {
    fn kind(&self) -> EventKind {
        match self {
            MutationIntent::Create { .. } => EventKind::ItemCreate,
            MutationIntent::Edit { .. } => EventKind::ItemEdit,
            MutationIntent::Delete { .. } => EventKind::ItemDelete,
        }
    }
}

/// Raised by the catalog controller when the API rejects the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Unauthenticated,
}

impl BusEvent for SessionSignal {
    fn kind(&self) -> EventKind {
        EventKind::SessionUnauthenticated
    }
}

pub struct EventBus<E: BusEvent> {
    tx: broadcast::Sender<E>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: E) -> usize {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(%kind, receivers, "event published");
                receivers
            }
            Err(_) => {
                debug!(%kind, "event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
