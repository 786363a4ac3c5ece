//! graphvault: versioned storage for repository structure graphs
//!
//! Each analysis of a repository at a commit produces a graph of nodes (files,
//! folders, functions, ...) and relationships. graphvault keeps one snapshot
//! per `(owner, repo, commit)`, records every snapshot in a per-repository
//! history, and compares any two snapshots structurally.
//!
//! # Components
//!
//! - [`VersionStore`]: commit-addressed snapshots on disk plus the history index
//! - [`DualWriteCoordinator`]: authoritative in-memory graph mirrored to an
//!   optional, best-effort [`SecondaryStore`]
//! - [`compare`]: structural diff between two snapshots
//! - [`ChangeDetector`]: content fingerprints deciding whether re-ingestion is needed
//! - [`ResponseCache`]: TTL/LRU caches for upstream file and listing fetches
//! - [`GraphService`]: the request surface used by the CLI
//!
//! # Feature Flags
//!
//! - **`sqlite-secondary`** (default): [`dual_write::SqliteGraphStore`], a
//!   SQLite-backed secondary store with its own query methods.
//!
//! # Example
//!
//! ```no_run
//! use graphvault::{GraphNode, GraphService, StoreRequest, StoredGraph};
//!
//! let service = GraphService::open(".graphvault");
//! let graph = StoredGraph::new(vec![GraphNode::new("src/lib.rs", "File")], vec![]);
//! let meta = service
//!     .store(StoreRequest::new("octocat", "hello-world", "abc1234", graph))
//!     .unwrap();
//! assert_eq!(meta.commit_number, 1);
//! ```

pub mod cache;
pub mod change;
pub mod config;
pub mod dual_write;
pub mod error;
pub mod error_codes;
pub mod graph;
pub mod output;
pub mod service;
pub mod store;
pub mod validation;
pub mod verify;
pub mod version;

pub use cache::{content_key, listing_key, CachedResponse, ListingEntry, ListingKind, ResponseCache, ResponseCacheStats};
pub use change::{ChangeDetector, ChangeSet, Fingerprints, HASH_BATCH_SIZE};
pub use config::{CacheLimits, GraphVaultConfig, ResponseCacheConfig};
pub use dual_write::{
    BatchWriteOutcome, BufferedWrite, CommitInfo, DualWriteCoordinator, DualWriteStats,
    KnowledgeGraph, SecondaryStore, DEFAULT_BATCH_THRESHOLD,
};
pub use error::{GraphVaultError, Result};
pub use graph::{
    compare, graph_id, AnalysisHistoryEntry, DiffSummary, GraphDiff, GraphMetadata, GraphNode,
    GraphRelationship, Properties, PropertyValue, StoredGraph,
};
pub use output::OutputFormat;
pub use service::{GraphComparison, GraphService, StoreRequest};
pub use store::{HistoryIndex, VersionStore};
pub use verify::{verify_store, StoreVerifyReport};
