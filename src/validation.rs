//! Identifier and path validation.
//!
//! Repository owners, names and commit shas end up as components of on-disk
//! storage paths (`graphs/{owner}/{repo}/{sha}`), so every identifier is checked
//! before it reaches the filesystem.

use camino::{Utf8Component, Utf8Path};
use std::path::Path;

use crate::error::GraphVaultError;

/// Error types for identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Field missing or blank
    #[error("{0} is required")]
    Missing(&'static str),

    /// Field would not be a single normal path component
    #[error("{0} must be a single path segment: {1:?}")]
    NotASegment(&'static str, String),

    /// Field contains a control character
    #[error("{0} contains control characters: {1:?}")]
    ControlCharacter(&'static str, String),
}

impl From<IdentifierError> for GraphVaultError {
    fn from(err: IdentifierError) -> Self {
        GraphVaultError::Validation(err.to_string())
    }
}

/// Validate one identifier used as a storage path component.
///
/// Accepts anything that is non-blank, has no control characters, and parses
/// as exactly one normal component (no separators, no `.`/`..`).
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.trim().is_empty() {
        return Err(IdentifierError::Missing(field));
    }
    if value.chars().any(char::is_control) {
        return Err(IdentifierError::ControlCharacter(field, value.to_string()));
    }
    if value.contains('\\') {
        return Err(IdentifierError::NotASegment(field, value.to_string()));
    }

    let mut components = Utf8Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(segment)), None) if segment == value => Ok(()),
        _ => Err(IdentifierError::NotASegment(field, value.to_string())),
    }
}

/// Validate the (owner, repo, commit sha) triple addressing a snapshot
pub fn validate_commit_address(
    owner: &str,
    repo: &str,
    commit_sha: &str,
) -> Result<(), IdentifierError> {
    validate_segment("owner", owner)?;
    validate_segment("repo", repo)?;
    validate_segment("commitSha", commit_sha)?;
    Ok(())
}

/// Normalize a path relative to `root` into a `/`-separated key.
///
/// Returns `None` when the path is not under `root` or is not valid UTF-8.
pub fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let utf8 = Utf8Path::from_path(relative)?;
    let parts: Vec<&str> = utf8
        .components()
        .filter_map(|c| match c {
            Utf8Component::Normal(s) => Some(s),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_segment_accepts_normal_names() {
        assert!(validate_segment("owner", "octocat").is_ok());
        assert!(validate_segment("repo", "hello-world.rs").is_ok());
        assert!(validate_segment("commitSha", "abc1234").is_ok());
    }

    #[test]
    fn test_validate_segment_rejects_blank() {
        assert_eq!(
            validate_segment("owner", "  "),
            Err(IdentifierError::Missing("owner"))
        );
    }

    #[test]
    fn test_validate_segment_rejects_traversal_and_separators() {
        for bad in ["..", ".", "a/b", "../etc", "a\\b", "/abs"] {
            assert!(
                matches!(
                    validate_segment("repo", bad),
                    Err(IdentifierError::NotASegment(_, _))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_segment_rejects_control_chars() {
        assert!(matches!(
            validate_segment("repo", "bad\nname"),
            Err(IdentifierError::ControlCharacter(_, _))
        ));
    }

    #[test]
    fn test_identifier_error_maps_to_validation() {
        let err: GraphVaultError = IdentifierError::Missing("owner").into();
        assert_eq!(err.code(), "GV-VAL-001");
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/repo");
        let path = Path::new("/repo/src/lib.rs");
        assert_eq!(relative_key(path, root).as_deref(), Some("src/lib.rs"));
        assert_eq!(relative_key(Path::new("/other/x.rs"), root), None);
        assert_eq!(relative_key(root, root), None);
    }
}
