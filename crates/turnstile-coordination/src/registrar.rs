//! Node registration
//!
//! Ephemeral registrations live exactly as long as the registering session.

use tracing::debug;
use turnstile_common::path::{join_path, normalize_path, parent_path};
use turnstile_store::{CoordinationStore, CreateMode};

use crate::error::{CoordinationError, Result};
use crate::path::ensure_path;

/// Register an ephemeral sequential node `<parent>/<prefix><sequence>`.
///
/// The parent is created first if missing. Returns the full created path.
pub async fn register_sequential_with_prefix<S>(
    store: &S,
    parent_path: &str,
    prefix: &str,
    payload: &[u8],
) -> Result<String>
where
    S: CoordinationStore + ?Sized,
{
    let parent = normalize_path(parent_path)?;
    ensure_path(store, &parent).await?;

    // An empty prefix leaves a trailing separator, which the store keeps
    let request = join_path(&parent, prefix);

    let created = store
        .create(&request, payload, CreateMode::EphemeralSequential)
        .await
        .map_err(|e| CoordinationError::store("create", request.clone(), e))?;
    debug!(path = %created, "Registered sequential node");
    Ok(created)
}

/// Register an ephemeral node at exactly `full_path`.
///
/// The parent is created first if missing. Fails if the node already exists.
pub async fn register_plain<S>(store: &S, full_path: &str, payload: &[u8]) -> Result<String>
where
    S: CoordinationStore + ?Sized,
{
    let full_path = normalize_path(full_path)?;
    if let Some(parent) = parent_path(&full_path) {
        ensure_path(store, parent).await?;
    }

    let created = store
        .create(&full_path, payload, CreateMode::Ephemeral)
        .await
        .map_err(|e| CoordinationError::store("create", full_path.clone(), e))?;
    debug!(path = %created, "Registered ephemeral node");
    Ok(created)
}
