//! Error taxonomy for graphvault operations
//!
//! Lookup and validation failures are returned to the caller as-is. Primary
//! storage failures are fatal to the operation that hit them. Secondary store
//! failures never leave the dual-write boundary; the variant exists so they
//! can be logged and reported with a stable code.

use std::path::PathBuf;

use crate::error_codes::{
    GV_IO_001_STORAGE_IO, GV_NF_001_NOT_FOUND, GV_SEC_001_SECONDARY_WRITE,
    GV_SER_001_SERIALIZATION, GV_VAL_001_INVALID_INPUT,
};

#[derive(Debug, thiserror::Error)]
pub enum GraphVaultError {
    /// Repository, commit or payload absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or malformed request input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reading or writing the index or a payload failed
    #[error("storage I/O failed at {}: {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Secondary store call failed (non-fatal)
    #[error("secondary store write failed: {0}")]
    SecondaryWrite(String),

    /// Persisted document unreadable or unwritable as JSON
    #[error("serialization failed for {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GraphVaultError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Stable error code for JSON error responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => GV_NF_001_NOT_FOUND,
            Self::Validation(_) => GV_VAL_001_INVALID_INPUT,
            Self::StorageIo { .. } => GV_IO_001_STORAGE_IO,
            Self::SecondaryWrite(_) => GV_SEC_001_SECONDARY_WRITE,
            Self::Serialization { .. } => GV_SER_001_SERIALIZATION,
        }
    }

    /// Short category name used as the `error` field of error responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::StorageIo { .. } => "storage_io",
            Self::SecondaryWrite(_) => "secondary_write",
            Self::Serialization { .. } => "serialization",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, GraphVaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_display_and_code() {
        let err = GraphVaultError::not_found("octocat/hello-world@abc1234");
        assert!(err.to_string().contains("abc1234"));
        assert_eq!(err.code(), "GV-NF-001");
        assert_eq!(err.kind(), "not_found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = GraphVaultError::io("/tmp/index.json", io_err);
        assert_eq!(err.code(), "GV-IO-001");
        assert!(err.to_string().contains("/tmp/index.json"));
        assert!(err.source().unwrap().to_string().contains("denied"));
    }

    #[test]
    fn test_serialization_error_code() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken")
            .err()
            .unwrap();
        let err = GraphVaultError::serialization("graph payload", json_err);
        assert_eq!(err.code(), "GV-SER-001");
        assert!(!err.is_not_found());
    }
}
