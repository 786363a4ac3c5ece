//! Store verification
//!
//! Compares the history index against the payload directories on disk.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use walkdir::WalkDir;

use crate::error::{GraphVaultError, Result};
use crate::graph::StoredGraph;
use crate::store::{VersionStore, PAYLOAD_FILE};
use crate::validation::relative_key;

/// Report of store verification results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreVerifyReport {
    /// Locators recorded in the index whose payload file is absent
    pub missing_payloads: Vec<String>,
    /// Payload directories (any depth under `graphs/`) no index entry refers to
    pub orphaned_payloads: Vec<String>,
    /// Payloads that exist but do not decode
    pub unreadable_payloads: Vec<String>,
    /// Locators whose recorded node/relationship counts differ from the payload
    pub count_mismatches: Vec<String>,
    /// Number of commits recorded in the index
    pub commits_checked: usize,
}

impl StoreVerifyReport {
    /// Total number of issues found
    pub fn total_issues(&self) -> usize {
        self.missing_payloads.len()
            + self.orphaned_payloads.len()
            + self.unreadable_payloads.len()
            + self.count_mismatches.len()
    }

    /// Check if verification is clean (no issues)
    pub fn is_clean(&self) -> bool {
        self.total_issues() == 0
    }
}

/// Verify every index entry against the payloads on disk
///
/// Read-only. Commits sharing one payload (short sha collision) are checked
/// once per commit.
pub fn verify_store(store: &VersionStore) -> Result<StoreVerifyReport> {
    let index = store.index_snapshot()?;
    let mut report = StoreVerifyReport::default();

    let mut referenced: BTreeSet<String> = BTreeSet::new();
    let mut decoded: HashMap<String, Option<StoredGraph>> = HashMap::new();

    for meta in index.all_commits() {
        report.commits_checked += 1;
        referenced.insert(meta.storage_locator.clone());

        let graph = match decoded.get(&meta.storage_locator) {
            Some(graph) => graph.clone(),
            None => {
                let graph = read_payload(store, &meta.storage_locator, &mut report)?;
                decoded.insert(meta.storage_locator.clone(), graph.clone());
                graph
            }
        };

        if let Some(graph) = graph {
            if graph.node_count() != meta.node_count
                || graph.relationship_count() != meta.relationship_count
            {
                report.count_mismatches.push(meta.storage_locator.clone());
            }
        }
    }

    let graphs_dir = store.graphs_dir();
    for entry in WalkDir::new(&graphs_dir).min_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            GraphVaultError::io(&graphs_dir, io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() || entry.file_name() != PAYLOAD_FILE {
            continue;
        }
        let Some(locator) = entry
            .path()
            .parent()
            .and_then(|dir| relative_key(dir, store.root()))
        else {
            continue;
        };
        if !referenced.contains(&locator) {
            report.orphaned_payloads.push(locator);
        }
    }

    report.missing_payloads.dedup();
    report.unreadable_payloads.dedup();
    report.count_mismatches.sort();
    report.count_mismatches.dedup();

    tracing::debug!(
        commits = report.commits_checked,
        issues = report.total_issues(),
        "verified store"
    );
    Ok(report)
}

fn read_payload(
    store: &VersionStore,
    locator: &str,
    report: &mut StoreVerifyReport,
) -> Result<Option<StoredGraph>> {
    let path = store.payload_path(locator);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            report.missing_payloads.push(locator.to_string());
            return Ok(None);
        }
        Err(e) => return Err(GraphVaultError::io(path, e)),
    };
    match serde_json::from_slice::<StoredGraph>(&bytes) {
        Ok(graph) => Ok(Some(graph)),
        Err(_) => {
            report.unreadable_payloads.push(locator.to_string());
            Ok(None)
        }
    }
}
