//! Store error types

use turnstile_common::CommonError;

/// Errors reported by a coordination store
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("node '{0}' already exists")]
    NodeExists(String),

    #[error("node '{0}' does not exist")]
    NoNode(String),

    #[error("node '{0}' has children")]
    NotEmpty(String),

    #[error("ephemeral node '{0}' cannot have children")]
    NoChildrenForEphemerals(String),

    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("connection lost")]
    ConnectionLoss,

    #[error("session {0:#x} expired")]
    SessionExpired(i64),
}

impl StoreError {
    pub fn is_node_exists(&self) -> bool {
        matches!(self, StoreError::NodeExists(_))
    }

    pub fn is_no_node(&self) -> bool {
        matches!(self, StoreError::NoNode(_))
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, StoreError::SessionExpired(_))
    }
}

impl From<CommonError> for StoreError {
    fn from(value: CommonError) -> Self {
        StoreError::BadArguments(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
