//! Graphvault error codes
//!
//! Error codes follow the pattern: GV-{CATEGORY}-{3-digit number}
//!
//! Categories (2-3 uppercase letters):
//! - NF: Lookup errors (repository, commit or payload absent)
//! - VAL: Request validation errors (missing or malformed input)
//! - IO: Primary store I/O errors (index or payload read/write)
//! - SEC: Secondary store errors (never fatal, reported in statistics)
//! - SER: Serialization errors (corrupt or unreadable payload)
//!
//! Each error code is stable and should not be reused.

/// Repository, commit or graph payload not found
pub const GV_NF_001_NOT_FOUND: &str = "GV-NF-001";

/// Required input field missing or malformed
pub const GV_VAL_001_INVALID_INPUT: &str = "GV-VAL-001";

/// Primary store read or write failed
pub const GV_IO_001_STORAGE_IO: &str = "GV-IO-001";

/// Secondary store write failed
pub const GV_SEC_001_SECONDARY_WRITE: &str = "GV-SEC-001";

/// Persisted document could not be encoded or decoded
pub const GV_SER_001_SERIALIZATION: &str = "GV-SER-001";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | GV-NF-001 | Not found | Check owner/repo/sha with `graphvault history` |
/// | GV-VAL-001 | Invalid input | Supply owner, repo, commit sha and a graph |
/// | GV-IO-001 | Storage I/O | Check permissions and free space of the data dir |
/// | GV-SEC-001 | Secondary write | Inspect the secondary database; primary data is intact |
/// | GV-SER-001 | Serialization | Re-store the commit; the payload may be corrupted |
pub const ERROR_CODE_DOCUMENTATION: &str = "Error code documentation available in source";
