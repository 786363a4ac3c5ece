//! JSON output types for CLI commands
//!
//! Every JSON document printed by the binary is wrapped in a schema-versioned
//! [`JsonResponse`]; failures print an [`ErrorResponse`] carrying the stable
//! error code.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GraphVaultError;

/// Current JSON output schema version
pub const GRAPHVAULT_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Wrapper for all JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for parsing stability
    pub schema_version: String,
    /// Unique execution ID for this run
    pub execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub data: T,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: GRAPHVAULT_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: Some("graphvault".to_string()),
            timestamp: Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            data,
        }
    }
}

/// Error payload of a failed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category (`not_found`, `validation`, ...)
    pub error: String,
    /// Stable error code, e.g. `GV-NF-001`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Error response for a failure outside the library taxonomy
    pub fn generic(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            code: None,
            message: message.into(),
        }
    }
}

impl From<&GraphVaultError> for ErrorResponse {
    fn from(err: &GraphVaultError) -> Self {
        Self {
            error: err.kind().to_string(),
            code: Some(err.code().to_string()),
            message: err.to_string(),
        }
    }
}

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Human,
    /// JSON output with schema versioning
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}. Must be human or json", s)),
        }
    }
}

/// Generate a unique execution ID for this run
///
/// Uses timestamp + process ID for uniqueness.
pub fn generate_execution_id() -> String {
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let pid = process::id();

    format!("{:x}-{:x}", timestamp, pid)
}

/// Output JSON to stdout
pub fn output_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}
