//! Node, watch, and session model types

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// How a node is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateMode {
    /// Survives the creating session
    Persistent,
    /// Removed when the creating session ends
    Ephemeral,
    /// Persistent, with a server-assigned sequence suffix
    PersistentSequential,
    /// Ephemeral, with a server-assigned sequence suffix
    EphemeralSequential,
}

impl CreateMode {
    pub fn new(ephemeral: bool, sequential: bool) -> Self {
        match (ephemeral, sequential) {
            (false, false) => CreateMode::Persistent,
            (true, false) => CreateMode::Ephemeral,
            (false, true) => CreateMode::PersistentSequential,
            (true, true) => CreateMode::EphemeralSequential,
        }
    }

    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }
}

/// Session lifecycle as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Connected,
    /// Connection dropped; the session and its ephemerals may still be alive
    Disconnected,
    /// The session is gone along with every ephemeral node it owned
    SessionExpired,
    /// Closed by the client
    Closed,
}

impl SessionState {
    /// True once the session can never be used again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::SessionExpired | SessionState::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connected => write!(f, "CONNECTED"),
            SessionState::Disconnected => write!(f, "DISCONNECTED"),
            SessionState::SessionExpired => write!(f, "SESSION_EXPIRED"),
            SessionState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Kind of change that fired a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
}

/// Notification delivered to a watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub path: String,
}

/// The store dropped the watch without firing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("watch cancelled")]
pub struct WatchCancelled;

/// One-shot watch on a single path.
///
/// Resolves exactly once with the next change of the watched path. Dropping the
/// watch unregisters interest.
#[derive(Debug)]
pub struct Watch {
    rx: oneshot::Receiver<WatchEvent>,
}

impl Watch {
    pub fn new(rx: oneshot::Receiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Create a watch together with the sender a store uses to fire it.
    pub fn channel() -> (oneshot::Sender<WatchEvent>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self::new(rx))
    }
}

impl Future for Watch {
    type Output = Result<WatchEvent, WatchCancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map_err(|_| WatchCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mode_flags() {
        assert_eq!(CreateMode::new(true, true), CreateMode::EphemeralSequential);
        assert_eq!(CreateMode::new(false, false), CreateMode::Persistent);
        assert!(CreateMode::Ephemeral.is_ephemeral());
        assert!(!CreateMode::Ephemeral.is_sequential());
        assert!(CreateMode::PersistentSequential.is_sequential());
        assert!(!CreateMode::PersistentSequential.is_ephemeral());
    }

    #[test]
    fn test_session_state() {
        assert!(SessionState::SessionExpired.is_terminal());
        assert!(SessionState::Closed.is_terminal());
        assert!(!SessionState::Disconnected.is_terminal());
        assert_eq!(SessionState::Connected.to_string(), "CONNECTED");
    }

    #[tokio::test]
    async fn test_watch_fires_once() {
        let (tx, watch) = Watch::channel();
        tx.send(WatchEvent {
            event_type: EventType::NodeDeleted,
            path: "/a".to_string(),
        })
        .unwrap();
        let event = watch.await.unwrap();
        assert_eq!(event.event_type, EventType::NodeDeleted);
        assert_eq!(event.path, "/a");
    }

    #[tokio::test]
    async fn test_watch_cancelled_when_sender_dropped() {
        let (tx, watch) = Watch::channel();
        drop(tx);
        assert_eq!(watch.await, Err(WatchCancelled));
    }
}
