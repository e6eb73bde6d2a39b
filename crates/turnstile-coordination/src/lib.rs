//! Turnstile Coordination - election and locking recipes
//!
//! This crate provides:
//! - Sequence parsing and sibling ranking for sequential node names
//! - Path management (ensure/delete hierarchical paths)
//! - Node registration (plain and sequential ephemeral nodes)
//! - The election/lock engine: campaign/resign and lock/unlock with
//!   predecessor-only watches, timeouts, and reentrancy guards
//! - A service registry for fixed-identity instance registration

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod path;
pub mod registrar;
pub mod registry;
pub mod sequence;

// Re-export commonly used types
pub use config::CoordinationConfig;
pub use engine::CoordinationClient;
pub use error::{CoordinationError, Result};
pub use path::{delete_path, ensure_path};
pub use registrar::{register_plain, register_sequential_with_prefix};
pub use registry::{ServiceInstance, ServiceKey, ServiceRegistry, ServiceRole};
pub use sequence::{Extremum, find_extremum, max_sequence, min_sequence, parse_sequence, predecessor};

pub use turnstile_common::ContentionKind;
pub use turnstile_store::{CoordinationStore, MemoryEnsemble, MemorySession};
