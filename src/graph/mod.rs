//! Graph data model and structural diff
//!
//! The ingestion pipeline produces [`StoredGraph`] values; everything else in
//! the crate stores, serves and compares them.
pub mod diff;
pub mod schema;

pub use diff::{compare, DiffSummary, GraphDiff};
pub use schema::{
    graph_id, repo_key, short_sha, AnalysisHistoryEntry, GraphMetadata, GraphNode,
    GraphRelationship, Properties, PropertyValue, StoredGraph, SHORT_SHA_LEN,
};
