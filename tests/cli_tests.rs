//! CLI smoke tests for the graphvault binary
//!
//! Runs the built binary against a temporary data directory and checks the
//! JSON envelopes it prints.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn graphvault(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_graphvault"))
        .args(args)
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--output")
        .arg("json")
        .env_remove("GRAPHVAULT_SECONDARY_DB")
        .env_remove("GRAPHVAULT_DATA_DIR")
        .output()
        .expect("Failed to start graphvault binary")
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}\nstderr: {}",
            e,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn write_graph(dir: &Path, name: &str, nodes: &[&str], rels: &[(&str, &str, &str)]) -> String {
    let graph = serde_json::json!({
        "nodes": nodes
            .iter()
            .map(|id| serde_json::json!({"id": id, "label": "File"}))
            .collect::<Vec<_>>(),
        "relationships": rels
            .iter()
            .enumerate()
            .map(|(i, (ty, s, t))| serde_json::json!({
                "id": format!("r{}", i),
                "type": ty,
                "source": s,
                "target": t
            }))
            .collect::<Vec<_>>(),
    });
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(&graph).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn store(data_dir: &Path, sha: &str, graph: &str) -> Output {
    graphvault(
        data_dir,
        &[
            "store", "--owner", "octocat", "--repo", "hello-world", "--sha", sha, "--graph", graph,
            "--message", "initial",
        ],
    )
}

#[test]
fn test_store_history_load_compare() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let first = write_graph(
        temp_dir.path(),
        "first.json",
        &["README.md", "src/lib.rs"],
        &[("CONTAINS", "README.md", "src/lib.rs")],
    );
    let second = write_graph(
        temp_dir.path(),
        "second.json",
        &["src/lib.rs", "src/main.rs"],
        &[("IMPORTS", "src/main.rs", "src/lib.rs")],
    );

    let output = store(&data_dir, "abc1234", &first);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stored = json(&output);
    assert_eq!(stored["data"]["metadata"]["commitNumber"], 1);
    assert_eq!(stored["data"]["metadata"]["nodeCount"], 2);
    assert_eq!(stored["data"]["secondaryConfigured"], false);
    assert!(stored["execution_id"].is_string());

    let output = store(&data_dir, "def5678", &second);
    assert!(output.status.success());
    assert_eq!(json(&output)["data"]["metadata"]["commitNumber"], 2);

    let output = graphvault(&data_dir, &["history", "--owner", "octocat", "--repo", "hello-world"]);
    assert!(output.status.success());
    let history = json(&output);
    let commits = history["data"][0]["commits"].as_array().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0]["commitSha"], "abc1234");
    assert_eq!(commits[1]["commitMessage"], "initial");

    let output = graphvault(
        &data_dir,
        &["load", "--owner", "octocat", "--repo", "hello-world", "--sha", "abc1234"],
    );
    assert!(output.status.success());
    let loaded = json(&output);
    assert_eq!(loaded["data"]["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(loaded["data"]["relationships"][0]["type"], "CONTAINS");

    let output = graphvault(
        &data_dir,
        &[
            "compare", "--owner", "octocat", "--repo", "hello-world", "--from", "abc1234", "--to",
            "def5678",
        ],
    );
    assert!(output.status.success());
    let summary = &json(&output)["data"]["summary"];
    assert_eq!(summary["nodesAdded"], 1);
    assert_eq!(summary["nodesRemoved"], 1);
    assert_eq!(summary["relationshipsAdded"], 1);
    assert_eq!(summary["relationshipsRemoved"], 1);

    let output = graphvault(&data_dir, &["verify"]);
    assert!(output.status.success());
}

#[test]
fn test_missing_graph_reports_not_found_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = graphvault(
        temp_dir.path(),
        &["load", "--owner", "octocat", "--repo", "hello-world", "--sha", "0000000"],
    );

    assert_eq!(output.status.code(), Some(1));
    let response = json(&output);
    assert_eq!(response["data"]["error"], "not_found");
    assert_eq!(response["data"]["code"], "GV-NF-001");
}

#[test]
fn test_store_rejects_missing_owner() {
    let temp_dir = TempDir::new().unwrap();
    let graph = write_graph(temp_dir.path(), "g.json", &["a"], &[]);
    let output = graphvault(
        temp_dir.path(),
        &["store", "--repo", "hello-world", "--sha", "abc1234", "--graph", &graph],
    );

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&output)["data"]["code"], "GV-VAL-001");
}

#[test]
fn test_usage_error_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = graphvault(temp_dir.path(), &["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}
