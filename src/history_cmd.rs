//! History command implementation

use anyhow::Result;
use graphvault::output::{output_json, JsonResponse};
use graphvault::{AnalysisHistoryEntry, GraphService, OutputFormat};

/// List stored commits of every repository, or of one
pub fn run_history(
    service: &GraphService,
    repo: Option<(&str, &str)>,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let entries = match repo {
        Some((owner, name)) => vec![service.repo_history(owner, name)?],
        None => service.history()?,
    };

    match output_format {
        OutputFormat::Json => output_json(&JsonResponse::new(&entries, exec_id))?,
        OutputFormat::Human => print_entries(&entries),
    }
    Ok(0)
}

fn print_entries(entries: &[AnalysisHistoryEntry]) {
    if entries.is_empty() {
        println!("No stored graphs.");
        return;
    }
    for entry in entries {
        println!(
            "{} ({} commits, updated {})",
            entry.repo_key(),
            entry.commits.len(),
            entry.last_updated.to_rfc3339()
        );
        for commit in &entry.commits {
            let message = commit.commit_message.lines().next().unwrap_or_default();
            println!(
                "  #{:<3} {}  {:>6} nodes {:>6} rels  {}",
                commit.commit_number,
                commit.commit_sha,
                commit.node_count,
                commit.relationship_count,
                message
            );
        }
    }
}
