//! Coordination error types

use std::time::Duration;

use turnstile_common::error::{
    ACQUIRE_TIMEOUT, ALREADY_HELD, COORDINATION_SERVICE_ERROR, EMPTY_INPUT, MALFORMED_SEQUENCE,
    NO_VALID_SEQUENCE, NOT_HELD, PARAMETER_VALIDATE_ERROR, SERIALIZATION_ERROR, SESSION_LOSS,
};
use turnstile_common::{CommonError, ErrorCode};
use turnstile_store::StoreError;

/// Errors returned by the coordination recipes
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("malformed sequence node '{name}' for prefix '{prefix}'")]
    MalformedSequence { name: String, prefix: String },

    #[error("no valid sequence node with prefix '{prefix}'")]
    NoValidSequence { prefix: String },

    #[error("empty sibling list")]
    EmptyInput,

    #[error("deadlock: '{0}' is already held by this client")]
    AlreadyHeld(String),

    #[error("'{0}' is not held by this client")]
    NotHeld(String),

    #[error("coordination service error: {op} '{path}'")]
    Store {
        op: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("timed out after {waited:?} waiting for '{path}'")]
    Timeout { path: String, waited: Duration },

    #[error("session lost while holding or contending for '{0}'")]
    SessionLoss(String),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] CommonError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoordinationError {
    pub(crate) fn store(op: &'static str, path: impl Into<String>, source: StoreError) -> Self {
        CoordinationError::Store {
            op,
            path: path.into(),
            source,
        }
    }

    /// Structured code for reporting
    pub fn code(&self) -> ErrorCode<'static> {
        match self {
            CoordinationError::MalformedSequence { .. } => MALFORMED_SEQUENCE,
            CoordinationError::NoValidSequence { .. } => NO_VALID_SEQUENCE,
            CoordinationError::EmptyInput => EMPTY_INPUT,
            CoordinationError::AlreadyHeld(_) => ALREADY_HELD,
            CoordinationError::NotHeld(_) => NOT_HELD,
            CoordinationError::Store { .. } => COORDINATION_SERVICE_ERROR,
            CoordinationError::Timeout { .. } => ACQUIRE_TIMEOUT,
            CoordinationError::SessionLoss(_) => SESSION_LOSS,
            CoordinationError::InvalidPath(_) => PARAMETER_VALIDATE_ERROR,
            CoordinationError::Serialization(_) => SERIALIZATION_ERROR,
        }
    }

    /// Short label used for the `outcome` metric dimension
    pub fn outcome(&self) -> &'static str {
        match self {
            CoordinationError::AlreadyHeld(_) => "already_held",
            CoordinationError::NotHeld(_) => "not_held",
            CoordinationError::Timeout { .. } => "timeout",
            CoordinationError::SessionLoss(_) => "session_loss",
            CoordinationError::Store { .. } => "store_error",
            _ => "invalid",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinationError>;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoordinationError::AlreadyHeld("/test-client-lock".to_string());
        assert_eq!(
            err.to_string(),
            "deadlock: '/test-client-lock' is already held by this client"
        );

        let err = CoordinationError::NotHeld("/a".to_string());
        assert_eq!(err.to_string(), "'/a' is not held by this client");

        let err = CoordinationError::Timeout {
            path: "/a".to_string(),
            waited: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "timed out after 1.5s waiting for '/a'");
    }

    #[test]
    fn test_store_error_keeps_cause() {
        let err = CoordinationError::store(
            "create",
            "/locks/a/lock-",
            StoreError::SessionExpired(0x10),
        );
        assert_eq!(err.to_string(), "coordination service error: create '/locks/a/lock-'");
        let source = err.source().expect("cause should be preserved");
        assert_eq!(source.to_string(), "session 0x10 expired");
    }

    #[test]
    fn test_codes() {
        assert_eq!(CoordinationError::EmptyInput.code(), EMPTY_INPUT);
        assert_eq!(
            CoordinationError::SessionLoss("/a".to_string()).code().code,
            32001
        );
        assert_eq!(
            CoordinationError::AlreadyHeld("/a".to_string()).outcome(),
            "already_held"
        );
    }
}
