//! Graph schema definitions for graphvault
//!
//! Defines the node, relationship and snapshot payloads handed over by the
//! ingestion pipeline, plus the per-commit metadata kept in the history index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of leading sha characters used in graph ids
pub const SHORT_SHA_LEN: usize = 7;

/// Property value attached to nodes and relationships
///
/// Closed set of JSON-compatible shapes. Keys are kept in a sorted map so
/// serialized payloads are deterministic, and unknown keys round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

/// Open property map of a node or relationship
pub type Properties = BTreeMap<String, PropertyValue>;

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(small) => PropertyValue::Int(small),
            Err(_) => PropertyValue::UInt(value),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Node of a repository structure graph (file, folder, function, class, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique within a snapshot; stable across snapshots for unchanged entities
    pub id: String,
    /// Category tag
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Directed edge between two nodes
///
/// `id` is unique within a snapshot but regenerated on every ingestion, so
/// comparisons across snapshots use [`GraphRelationship::composite_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub properties: Properties,
}

impl GraphRelationship {
    pub fn new(
        id: impl Into<String>,
        rel_type: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            source: source.into(),
            target: target.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Logical identity used when diffing: `source|type|target`
    pub fn composite_key(&self) -> String {
        format!("{}|{}|{}", self.source, self.rel_type, self.target)
    }
}

/// Complete graph of one repository at one commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
}

impl StoredGraph {
    pub fn new(nodes: Vec<GraphNode>, relationships: Vec<GraphRelationship>) -> Self {
        Self {
            nodes,
            relationships,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Metadata of one stored snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    /// `{owner}_{repo}_{short sha}`
    pub id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub commit_sha: String,
    /// Ordinal position within the repository's history
    pub commit_number: usize,
    #[serde(default)]
    pub commit_message: String,
    pub commit_date: DateTime<Utc>,
    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
    pub node_count: usize,
    pub relationship_count: usize,
    /// Opaque reference to the persisted payload
    pub storage_locator: String,
}

/// All known commits of one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisHistoryEntry {
    pub repo_owner: String,
    pub repo_name: String,
    pub commits: Vec<GraphMetadata>,
    pub last_updated: DateTime<Utc>,
}

impl AnalysisHistoryEntry {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            repo_owner: owner.to_string(),
            repo_name: repo.to_string(),
            commits: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// `owner/repo`
    pub fn repo_key(&self) -> String {
        repo_key(&self.repo_owner, &self.repo_name)
    }

    pub fn find_commit(&self, commit_sha: &str) -> Option<&GraphMetadata> {
        self.commits.iter().find(|c| c.commit_sha == commit_sha)
    }
}

/// History key of a repository
pub fn repo_key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

/// Leading characters of a commit sha (the whole sha if shorter)
pub fn short_sha(commit_sha: &str) -> &str {
    match commit_sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &commit_sha[..idx],
        None => commit_sha,
    }
}

/// Deterministic graph id for (owner, repo, commit)
pub fn graph_id(owner: &str, repo: &str, commit_sha: &str) -> String {
    format!("{}_{}_{}", owner, repo, short_sha(commit_sha))
}
