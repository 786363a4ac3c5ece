//! Structural diff between two graph snapshots
//!
//! Nodes are matched by `id`. Relationships are matched by their composite key
//! `source|type|target` because relationship ids are regenerated on every
//! ingestion. Two edges sharing endpoints and type collapse into one logical
//! edge for diffing purposes.
//!
//! Pure and allocation-bounded: one hash set per side, O(|A| + |B|).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::graph::schema::{GraphNode, GraphRelationship, StoredGraph};

/// Delta from graph A to graph B
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDiff {
    /// Nodes in B whose id is absent from A
    pub nodes_added: Vec<GraphNode>,
    /// Nodes in A whose id is absent from B
    pub nodes_removed: Vec<GraphNode>,
    /// Relationships in B whose composite key is absent from A
    pub relationships_added: Vec<GraphRelationship>,
    /// Relationships in A whose composite key is absent from B
    pub relationships_removed: Vec<GraphRelationship>,
}

/// Counts of a [`GraphDiff`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub relationships_added: usize,
    pub relationships_removed: usize,
}

impl GraphDiff {
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            nodes_added: self.nodes_added.len(),
            nodes_removed: self.nodes_removed.len(),
            relationships_added: self.relationships_added.len(),
            relationships_removed: self.relationships_removed.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.nodes_removed.is_empty()
            && self.relationships_added.is_empty()
            && self.relationships_removed.is_empty()
    }
}

/// Compare two snapshots
///
/// Output order follows the input order of the side each entry comes from,
/// but callers must not rely on it.
pub fn compare(a: &StoredGraph, b: &StoredGraph) -> GraphDiff {
    let ids_a: HashSet<&str> = a.nodes.iter().map(|n| n.id.as_str()).collect();
    let ids_b: HashSet<&str> = b.nodes.iter().map(|n| n.id.as_str()).collect();

    let keys_a: HashSet<String> = a.relationships.iter().map(|r| r.composite_key()).collect();
    let keys_b: HashSet<String> = b.relationships.iter().map(|r| r.composite_key()).collect();

    GraphDiff {
        nodes_added: b
            .nodes
            .iter()
            .filter(|n| !ids_a.contains(n.id.as_str()))
            .cloned()
            .collect(),
        nodes_removed: a
            .nodes
            .iter()
            .filter(|n| !ids_b.contains(n.id.as_str()))
            .cloned()
            .collect(),
        relationships_added: b
            .relationships
            .iter()
            .filter(|r| !keys_a.contains(&r.composite_key()))
            .cloned()
            .collect(),
        relationships_removed: a
            .relationships
            .iter()
            .filter(|r| !keys_b.contains(&r.composite_key()))
            .cloned()
            .collect(),
    }
}
