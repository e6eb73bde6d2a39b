//! Turnstile Store - coordination-service contract
//!
//! This crate provides:
//! - The `CoordinationStore` trait consumed by the coordination recipes
//! - Node, watch, and session model types
//! - `MemoryEnsemble`, an in-process namespace with ephemeral/sequential nodes,
//!   one-shot watches, and session lifecycle, used by tests and simulations

pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{DEFAULT_SESSION_TIMEOUT, MemoryEnsemble, MemorySession};
pub use model::{CreateMode, EventType, SessionState, Watch, WatchCancelled, WatchEvent};
pub use traits::CoordinationStore;
