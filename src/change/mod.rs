//! Content fingerprints and file-level change classification
//!
//! Decides, without any network access, whether a repository's file set needs
//! re-ingestion by comparing a fresh `path -> digest` map with a stored one.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{GraphVaultError, Result};
use crate::validation::relative_key;

/// Files hashed per batch
pub const HASH_BATCH_SIZE: usize = 50;

/// Directories never fingerprinted by [`fingerprint_directory`]
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// `path -> hex digest`
pub type Fingerprints = BTreeMap<String, String>;

/// File-level classification of `current` against `stored`
///
/// The four sets partition the union of both key sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }

    /// Paths that need re-ingestion (added or modified)
    pub fn changed_paths(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.modified.iter())
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// SHA-256 fingerprinting with bounded batch sizes
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    batch_size: usize,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(HASH_BATCH_SIZE)
    }
}

impl ChangeDetector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Hex SHA-256 of `content`
    pub fn hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Fingerprint every file, `batch_size` files at a time
    ///
    /// Files inside one batch are hashed in parallel; batches run one after the
    /// other so a huge repository never fans out beyond one batch.
    pub fn hash_all<K, V>(&self, files: &BTreeMap<K, V>) -> Fingerprints
    where
        K: AsRef<str> + Sync,
        V: AsRef<[u8]> + Sync,
    {
        let entries: Vec<(&K, &V)> = files.iter().collect();
        let mut out = Fingerprints::new();
        for batch in entries.chunks(self.batch_size) {
            let hashed: Vec<(String, String)> = batch
                .par_iter()
                .map(|(path, content)| {
                    (path.as_ref().to_string(), Self::hash(content.as_ref()))
                })
                .collect();
            out.extend(hashed);
        }
        out
    }

    /// Classify every path of `current` and `stored`
    pub fn compare(current: &Fingerprints, stored: &Fingerprints) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, digest) in current {
            match stored.get(path) {
                None => {
                    changes.added.insert(path.clone());
                }
                Some(old) if old != digest => {
                    changes.modified.insert(path.clone());
                }
                Some(_) => {
                    changes.unchanged.insert(path.clone());
                }
            }
        }
        for path in stored.keys() {
            if !current.contains_key(path) {
                changes.deleted.insert(path.clone());
            }
        }
        changes
    }

    pub fn has_changes(current: &Fingerprints, stored: &Fingerprints) -> bool {
        Self::quick_count_mismatch(current, stored) || Self::compare(current, stored).has_changes()
    }

    /// O(1) pre-check: differing file counts always mean a change
    pub fn quick_count_mismatch(current: &Fingerprints, stored: &Fingerprints) -> bool {
        current.len() != stored.len()
    }

    /// Fingerprint every regular file under `root`
    ///
    /// Keys are `/`-separated paths relative to `root`. VCS metadata directories
    /// are skipped and symlinks are not followed.
    pub fn fingerprint_directory(&self, root: &Path) -> Result<Fingerprints> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && e.file_name()
                        .to_str()
                        .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
            });

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                GraphVaultError::io(path, io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let key = relative_key(entry.path(), root);
            match key {
                Some(key) => paths.push((key, entry.into_path())),
                None => tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 path"),
            }
        }

        let mut out = Fingerprints::new();
        for batch in paths.chunks(self.batch_size) {
            let hashed: Vec<Result<(String, String)>> = batch
                .par_iter()
                .map(|(key, path)| {
                    let bytes = fs::read(path).map_err(|e| GraphVaultError::io(path, e))?;
                    Ok((key.clone(), Self::hash(&bytes)))
                })
                .collect();
            for item in hashed {
                let (key, digest) = item?;
                out.insert(key, digest);
            }
        }
        Ok(out)
    }
}

/// Read a fingerprint map written by [`save_fingerprints`]
pub fn load_fingerprints(path: &Path) -> Result<Fingerprints> {
    let bytes = fs::read(path).map_err(|e| GraphVaultError::io(path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GraphVaultError::serialization(path.display().to_string(), e))
}

pub fn save_fingerprints(path: &Path, fingerprints: &Fingerprints) -> Result<()> {
    let json = serde_json::to_vec_pretty(fingerprints)
        .map_err(|e| GraphVaultError::serialization(path.display().to_string(), e))?;
    fs::write(path, json).map_err(|e| GraphVaultError::io(path, e))
}
