//! Transient toast feedback shared by both controllers.

use std::time::Duration;

use tokio::{sync::watch, time::Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Fire-and-forget notification target; callers never wait on delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: ToastKind, message: String);

    fn success(&self, message: &str) {
        self.notify(ToastKind::Success, message.to_string());
    }

    fn warning(&self, message: &str) {
        self.notify(ToastKind::Warning, message.to_string());
    }

    fn error(&self, message: &str) {
        self.notify(ToastKind::Error, message.to_string());
    }
}

/// Most recent toasts kept in [`ToastBoard::history`].
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct ToastBoard {
    next_id: u64,
    pub active: Vec<Toast>,
    /// Newest last, at most [`HISTORY_LIMIT`] entries.
    pub history: Vec<Toast>,
}

impl ToastBoard {
    /// Toasts raised since the sink was created, including trimmed ones.
    pub fn raised(&self) -> u64 {
        self.next_id
    }
}

/// Toasts expire `ttl` after they are raised; expired entries are dropped on the next access.
pub struct ToastSink {
    ttl: Duration,
    board: watch::Sender<ToastBoard>,
}

impl ToastSink {
    pub fn new(ttl: Duration) -> Self {
        let (board, _) = watch::channel(ToastBoard::default());
        Self { ttl, board }
    }

    pub fn active(&self) -> Vec<Toast> {
        self.prune();
        self.board.borrow().active.clone()
    }

    /// Recent toasts, expired or not.
    pub fn history(&self) -> Vec<Toast> {
        self.board.borrow().history.clone()
    }

    pub fn raised(&self) -> u64 {
        self.board.borrow().raised()
    }

    /// Observes every toast as it is raised. Expiry is applied lazily and is
    /// not itself announced.
    pub fn watch(&self) -> watch::Receiver<ToastBoard> {
        self.board.subscribe()
    }

    pub fn contains(&self, kind: ToastKind, message: &str) -> bool {
        self.board
            .borrow()
            .history
            .iter()
            .any(|toast| toast.kind == kind && toast.message == message)
    }

    fn prune(&self) {
        let now = Instant::now();
        self.board.send_if_modified(|board| {
            let before = board.active.len();
            board.active.retain(|toast| toast.expires_at > now);
            board.active.len() != before
        });
    }
}

impl NotificationSink for ToastSink {
    fn notify(&self, kind: ToastKind, message: String) {
        match kind {
            ToastKind::Error | ToastKind::Warning => warn!(?kind, "{message}"),
            ToastKind::Success => info!(?kind, "{message}"),
        }
        let expires_at = Instant::now() + self.ttl;
        self.board.send_modify(|board| {
            let now = Instant::now();
            board.active.retain(|toast| toast.expires_at > now);
            board.next_id += 1;
            let toast = Toast {
                id: board.next_id,
                kind,
                message,
                expires_at,
            };
            board.history.push(toast.clone());
            if board.history.len() > HISTORY_LIMIT {
                let excess = board.history.len() - HISTORY_LIMIT;
                board.history.drain(..excess);
            }
            board.active.push(toast);
        });
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
