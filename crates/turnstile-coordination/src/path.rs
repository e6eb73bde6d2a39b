//! Path management
//!
//! `ensure_path` creates every missing component of a path as a persistent
//! node; `delete_path` removes a whole subtree. Both are idempotent.

use tracing::debug;
use turnstile_common::path::{join_path, normalize_path, path_components};
use turnstile_common::ROOT_PATH;
use turnstile_store::{CoordinationStore, CreateMode};

use crate::error::{CoordinationError, Result};

/// Create `path` and all of its missing ancestors as persistent, empty nodes.
pub async fn ensure_path<S>(store: &S, path: &str) -> Result<()>
where
    S: CoordinationStore + ?Sized,
{
    let path = normalize_path(path)?;
    let mut current = String::with_capacity(path.len());

    for component in path_components(&path) {
        current = join_path(&current, component);
        match store.create(&current, &[], CreateMode::Persistent).await {
            Ok(_) => debug!(path = %current, "Created path component"),
            Err(e) if e.is_node_exists() => {}
            Err(e) => return Err(CoordinationError::store("create", current, e)),
        }
    }
    Ok(())
}

/// Remove the subtree rooted at `path`, children first.
///
/// A node that is already gone, at any level, counts as deleted.
pub async fn delete_path<S>(store: &S, path: &str) -> Result<()>
where
    S: CoordinationStore + ?Sized,
{
    let path = normalize_path(path)?;
    if path == ROOT_PATH {
        return Err(CoordinationError::store(
            "delete",
            path,
            turnstile_store::StoreError::BadArguments("cannot delete the root".to_string()),
        ));
    }

    // Breadth-first discovery, then delete deepest first
    let mut discovered = vec![path];
    let mut cursor = 0;
    while cursor < discovered.len() {
        let parent = discovered[cursor].clone();
        cursor += 1;
        match store.children(&parent).await {
            Ok(children) => {
                discovered.extend(children.iter().map(|child| join_path(&parent, child)));
            }
            Err(e) if e.is_no_node() => {}
            Err(e) => return Err(CoordinationError::store("children", parent, e)),
        }
    }

    for node in discovered.iter().rev() {
        match store.delete(node).await {
            Ok(()) => {}
            Err(e) if e.is_no_node() => {}
            Err(e) => return Err(CoordinationError::store("delete", node.clone(), e)),
        }
    }

    debug!(path = %discovered[0], nodes = discovered.len(), "Deleted subtree");
    Ok(())
}
