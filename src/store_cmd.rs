//! Store, load and delete command implementations

use anyhow::Result;
use chrono::{DateTime, Utc};
use graphvault::output::{output_json, JsonResponse};
use graphvault::{
    CommitInfo, DualWriteCoordinator, DualWriteStats, GraphMetadata, GraphService,
    GraphVaultConfig, GraphVaultError, OutputFormat, StoredGraph,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of `graphvault store`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutput {
    pub metadata: GraphMetadata,
    pub dual_write: DualWriteStats,
    pub secondary_configured: bool,
}

/// Fields of `graphvault store` as given on the command line
pub struct StoreArgs {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub commit_sha: Option<String>,
    pub message: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub graph_path: Option<PathBuf>,
    pub secondary_db: Option<PathBuf>,
}

fn required(value: Option<String>, field: &str) -> Result<String, GraphVaultError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GraphVaultError::validation(format!("{} is required", field)))
}

fn read_graph(path: &Path) -> Result<StoredGraph, GraphVaultError> {
    let bytes = fs::read(path).map_err(|e| GraphVaultError::io(path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GraphVaultError::serialization(path.display().to_string(), e))
}

/// Ingest a graph file through the dual-write coordinator and persist it
pub fn run_store(
    mut config: GraphVaultConfig,
    args: StoreArgs,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let mut commit = CommitInfo::new(
        required(args.owner, "owner")?,
        required(args.repo, "repo")?,
        required(args.commit_sha, "commitSha")?,
    );
    if let Some(message) = args.message {
        commit = commit.with_message(message);
    }
    if let Some(date) = args.date {
        commit = commit.with_date(date);
    }
    let graph_path = args
        .graph_path
        .ok_or_else(|| GraphVaultError::validation("graph is required"))?;
    let graph = read_graph(&graph_path)?;

    if args.secondary_db.is_some() {
        config.secondary_db = args.secondary_db;
    }
    let mut coordinator = DualWriteCoordinator::from_config(&config);
    coordinator.begin_snapshot(&commit);
    coordinator.ingest(graph)?;

    let service = GraphService::open(&config.data_dir);
    let metadata = coordinator.persist(service.version_store(), &commit)?;
    let output = StoreOutput {
        metadata,
        dual_write: coordinator.stats(),
        secondary_configured: coordinator.has_secondary(),
    };

    match output_format {
        OutputFormat::Json => output_json(&JsonResponse::new(&output, exec_id))?,
        OutputFormat::Human => {
            let meta = &output.metadata;
            println!(
                "Stored {}/{}@{} as commit #{} ({} nodes, {} relationships)",
                meta.repo_owner,
                meta.repo_name,
                meta.commit_sha,
                meta.commit_number,
                meta.node_count,
                meta.relationship_count
            );
            if output.secondary_configured {
                let stats = &output.dual_write;
                println!(
                    "Secondary: {} nodes, {} relationships, {} errors",
                    stats.secondary_nodes, stats.secondary_relationships, stats.secondary_errors
                );
            }
        }
    }
    Ok(0)
}

pub fn run_load(
    service: &GraphService,
    owner: &str,
    repo: &str,
    commit_sha: &str,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let graph = service.load_graph(owner, repo, commit_sha)?;

    match output_format {
        OutputFormat::Json => output_json(&JsonResponse::new(&graph, exec_id))?,
        OutputFormat::Human => {
            println!("{}/{}@{}", owner, repo, commit_sha);
            println!("Nodes ({}):", graph.node_count());
            for node in &graph.nodes {
                println!("  {} [{}]", node.id, node.label);
            }
            println!("Relationships ({}):", graph.relationship_count());
            for rel in &graph.relationships {
                println!("  {} -[{}]-> {}", rel.source, rel.rel_type, rel.target);
            }
        }
    }
    Ok(0)
}

/// Result of `graphvault delete`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutput {
    pub commit_sha: String,
    pub deleted: bool,
}

pub fn run_delete(
    service: &GraphService,
    owner: &str,
    repo: &str,
    commit_sha: &str,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let deleted = service.delete_graph(owner, repo, commit_sha)?;

    match output_format {
        OutputFormat::Json => {
            let output = DeleteOutput {
                commit_sha: commit_sha.to_string(),
                deleted,
            };
            output_json(&JsonResponse::new(&output, exec_id))?;
        }
        OutputFormat::Human if deleted => println!("Deleted {}/{}@{}", owner, repo, commit_sha),
        OutputFormat::Human => println!("No stored graph for {}/{}@{}", owner, repo, commit_sha),
    }
    Ok(if deleted { 0 } else { 1 })
}
