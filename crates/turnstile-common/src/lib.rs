//! Turnstile Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Turnstile components:
//! - Error types and error codes
//! - Hierarchical path helpers (normalize, join, parent, components)
//! - Network address helpers
//! - Common constants

pub mod error;
pub mod net;
pub mod path;
pub mod utils;

// Re-exports for convenience
pub use error::{CommonError, ErrorCode};
pub use net::{host_address, split_host_port, ws_host_address, wss_host_address};
pub use path::{join_path, normalize_path, parent_path, path_components};
pub use utils::{is_valid_node_name, local_ip};

/// Separator between path components
pub const PATH_SEPARATOR: char = '/';

/// Root of every namespace
pub const ROOT_PATH: &str = "/";

/// Default prefix for sequential contender nodes
pub const DEFAULT_SEQUENCE_PREFIX: &str = "lock-";

/// Width of the zero-padded sequence suffix appended by the coordination service
pub const SEQUENCE_WIDTH: usize = 10;

/// Default root under which service instances are registered
pub const DEFAULT_REGISTRY_ROOT: &str = "/services";

/// Contention kind, used for log fields and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentionKind {
    /// Leader election (campaign/resign)
    Election,
    /// Mutual exclusion (lock/unlock)
    Lock,
}

impl ContentionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentionKind::Election => "election",
            ContentionKind::Lock => "lock",
        }
    }
}

impl std::fmt::Display for ContentionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContentionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "election" => Ok(ContentionKind::Election),
            "lock" => Ok(ContentionKind::Lock),
            _ => Err(format!("Invalid contention kind: {}", s)),
        }
    }
}
