//! Coordination-service contract
//!
//! The recipes never talk to a concrete client. They take an explicit handle
//! to an implementation of [`CoordinationStore`], which lets tests inject the
//! in-memory ensemble and lets callers plug in a networked client.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::model::{CreateMode, SessionState, Watch};

/// Hierarchical, linearizable coordination store bound to one client session
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Create a node and return its full path.
    ///
    /// For sequential modes the store appends a zero-padded, signed counter
    /// owned by the parent to the last path component.
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String>;

    /// Delete a leaf node.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Names (not full paths) of the children of `path`.
    async fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Check existence and leave a one-shot watch on `path`.
    ///
    /// The watch fires on the next create, delete, or data change of `path`,
    /// whether or not the node exists now.
    async fn exists_watch(&self, path: &str) -> Result<(bool, Watch)>;

    /// Payload stored at `path`.
    async fn get_data(&self, path: &str) -> Result<Vec<u8>>;

    /// Subscribe to session lifecycle changes.
    fn session_state(&self) -> watch::Receiver<SessionState>;

    /// Identifier of the bound session.
    fn session_id(&self) -> i64;
}
