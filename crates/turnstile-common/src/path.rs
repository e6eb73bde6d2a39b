//! Hierarchical path helpers
//!
//! Paths are absolute, slash-delimited and compared as normalized strings:
//! repeated and trailing separators are dropped, so `/test-lock/` and
//! `/test-lock` name the same node.

use crate::error::CommonError;
use crate::{PATH_SEPARATOR, ROOT_PATH};

/// Normalize an absolute path.
///
/// # Examples
///
/// ```
/// use turnstile_common::normalize_path;
///
/// assert_eq!(normalize_path("/test-lock/").unwrap(), "/test-lock");
/// assert_eq!(normalize_path("//a//b").unwrap(), "/a/b");
/// assert_eq!(normalize_path("/").unwrap(), "/");
/// assert!(normalize_path("relative/path").is_err());
/// ```
pub fn normalize_path(path: &str) -> Result<String, CommonError> {
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(CommonError::RelativePath(path.to_string()));
    }

    let mut normalized = String::with_capacity(path.len());
    for component in path.split(PATH_SEPARATOR).filter(|c| !c.is_empty()) {
        if component == "." || component == ".." {
            return Err(CommonError::InvalidComponent(
                path.to_string(),
                component.to_string(),
            ));
        }
        normalized.push(PATH_SEPARATOR);
        normalized.push_str(component);
    }

    if normalized.is_empty() {
        normalized.push_str(ROOT_PATH);
    }
    Ok(normalized)
}

/// Split a path into its non-empty components.
pub fn path_components(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Join a child name onto a parent path.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches(PATH_SEPARATOR);
    let child = child.trim_start_matches(PATH_SEPARATOR);
    format!("{}{}{}", parent, PATH_SEPARATOR, child)
}

/// Parent of a normalized path, `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(0) => Some(ROOT_PATH),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last component of a normalized path.
pub fn node_name(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trailing_and_repeated_separators() {
        assert_eq!(normalize_path("/test-lock/").unwrap(), "/test-lock");
        assert_eq!(normalize_path("/a//b///c/").unwrap(), "/a/b/c");
        assert_eq!(normalize_path("///").unwrap(), "/");
    }

    #[test]
    fn test_normalize_rejects_relative_and_dot_components() {
        assert_eq!(
            normalize_path("a/b"),
            Err(CommonError::RelativePath("a/b".to_string()))
        );
        assert!(normalize_path("/a/../b").is_err());
        assert!(normalize_path("/a/./b").is_err());
    }

    #[test]
    fn test_components() {
        assert_eq!(path_components("/a/b/c"), vec!["a", "b", "c"]);
        assert!(path_components("/").is_empty());
    }

    #[test]
    fn test_join_and_parent() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/a/", "b"), "/a/b");
        assert_eq!(join_path("/a", "lock-"), "/a/lock-");
        assert_eq!(parent_path("/a/b"), Some("/a"));
        assert_eq!(parent_path("/a"), Some("/"));
        assert_eq!(parent_path("/"), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_normalize_is_idempotent(parts in proptest::collection::vec("[a-z0-9-]{1,8}", 0..6)) {
            let raw = format!("/{}/", parts.join("//"));
            let once = normalize_path(&raw).unwrap();
            proptest::prop_assert_eq!(normalize_path(&once).unwrap(), once.clone());
            let expected: Vec<&str> = parts.iter().map(String::as_str).collect();
            proptest::prop_assert_eq!(path_components(&once), expected);
        }
    }

    #[test]
    fn test_node_name() {
        assert_eq!(node_name("/locks/res/lock-0000000003"), "lock-0000000003");
        assert_eq!(node_name("/a"), "a");
    }
}
