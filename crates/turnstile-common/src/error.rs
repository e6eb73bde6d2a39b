//! Error types and error codes for Turnstile
//!
//! This module defines:
//! - `CommonError`: validation errors raised by the shared helpers
//! - `ErrorCode`: structured codes reported by the CLI and by callers that
//!   need a stable numeric classification of coordination failures

use serde::{Deserialize, Serialize};

/// Validation errors raised by path and address helpers
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("path '{0}' must be absolute")]
    RelativePath(String),

    #[error("path '{0}' contains an invalid component '{1}'")]
    InvalidComponent(String, String),

    #[error("invalid address '{0}': {1}")]
    InvalidAddress(String, String),
}

/// Error code structure
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const MALFORMED_SEQUENCE: ErrorCode<'static> = ErrorCode {
    code: 30001,
    message: "malformed sequence node name",
};

pub const NO_VALID_SEQUENCE: ErrorCode<'static> = ErrorCode {
    code: 30002,
    message: "no valid sequence node",
};

pub const EMPTY_INPUT: ErrorCode<'static> = ErrorCode {
    code: 30003,
    message: "empty sibling list",
};

pub const ALREADY_HELD: ErrorCode<'static> = ErrorCode {
    code: 31001,
    message: "deadlock: path already held by this client",
};

pub const NOT_HELD: ErrorCode<'static> = ErrorCode {
    code: 31002,
    message: "path not held by this client",
};

pub const ACQUIRE_TIMEOUT: ErrorCode<'static> = ErrorCode {
    code: 31003,
    message: "acquire timed out",
};

pub const SESSION_LOSS: ErrorCode<'static> = ErrorCode {
    code: 32001,
    message: "coordination session lost",
};

pub const COORDINATION_SERVICE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 32002,
    message: "coordination service error",
};

pub const SERIALIZATION_ERROR: ErrorCode<'static> = ErrorCode {
    code: 33001,
    message: "payload serialization error",
};
