//! Fingerprint and changes command implementations

use anyhow::Result;
use graphvault::change::{load_fingerprints, save_fingerprints};
use graphvault::output::{output_json, JsonResponse};
use graphvault::{ChangeDetector, ChangeSet, GraphVaultConfig, OutputFormat};
use serde::Serialize;
use std::path::Path;

/// Result of `graphvault fingerprint`
#[derive(Debug, Serialize)]
pub struct FingerprintOutput {
    pub root: String,
    pub files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    pub fingerprints: graphvault::change::Fingerprints,
}

pub fn run_fingerprint(
    config: &GraphVaultConfig,
    root: &Path,
    save: Option<&Path>,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let detector = ChangeDetector::new(config.hash_batch_size);
    let fingerprints = detector.fingerprint_directory(root)?;
    if let Some(path) = save {
        save_fingerprints(path, &fingerprints)?;
    }

    match output_format {
        OutputFormat::Json => {
            let output = FingerprintOutput {
                root: root.display().to_string(),
                files: fingerprints.len(),
                saved_to: save.map(|p| p.display().to_string()),
                fingerprints,
            };
            output_json(&JsonResponse::new(&output, exec_id))?;
        }
        OutputFormat::Human => {
            for (path, digest) in &fingerprints {
                println!("{}  {}", digest, path);
            }
            println!("{} files", fingerprints.len());
            if let Some(path) = save {
                println!("Saved to {}", path.display());
            }
        }
    }
    Ok(0)
}

/// Result of `graphvault changes`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesOutput {
    pub has_changes: bool,
    pub count_mismatch: bool,
    pub changes: ChangeSet,
    pub baseline_updated: bool,
}

/// Exit code 1 when the checkout differs from the baseline
pub fn run_changes(
    config: &GraphVaultConfig,
    root: &Path,
    baseline: &Path,
    update: bool,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let stored = if update && !baseline.exists() {
        Default::default()
    } else {
        load_fingerprints(baseline)?
    };

    let current = ChangeDetector::new(config.hash_batch_size).fingerprint_directory(root)?;
    let count_mismatch = ChangeDetector::quick_count_mismatch(&current, &stored);
    let changes = ChangeDetector::compare(&current, &stored);
    let has_changes = changes.has_changes();

    let baseline_updated = update && has_changes;
    if baseline_updated {
        save_fingerprints(baseline, &current)?;
    }

    match output_format {
        OutputFormat::Json => {
            let output = ChangesOutput {
                has_changes,
                count_mismatch,
                changes,
                baseline_updated,
            };
            output_json(&JsonResponse::new(&output, exec_id))?;
        }
        OutputFormat::Human => {
            for path in &changes.added {
                println!("  + {}", path);
            }
            for path in &changes.modified {
                println!("  ~ {}", path);
            }
            for path in &changes.deleted {
                println!("  - {}", path);
            }
            if has_changes {
                println!(
                    "{} changed, {} unchanged",
                    changes.total_changes(),
                    changes.unchanged.len()
                );
            } else {
                println!("No changes ({} files).", changes.unchanged.len());
            }
            if baseline_updated {
                println!("Baseline updated: {}", baseline.display());
            }
        }
    }
    Ok(if has_changes { 1 } else { 0 })
}
