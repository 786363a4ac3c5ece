//! Authoritative in-memory graph
//!
//! Nodes and relationships are kept in insertion order with an id lookup table.
//! Re-adding an id replaces the stored item at its original position.

use std::collections::HashMap;

use crate::error::{GraphVaultError, Result};
use crate::graph::{GraphNode, GraphRelationship, StoredGraph};

#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    node_positions: HashMap<String, usize>,
    relationships: Vec<GraphRelationship>,
    relationship_positions: HashMap<String, usize>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a primary graph from a stored snapshot
    pub fn from_snapshot(graph: StoredGraph) -> Result<Self> {
        let mut primary = Self::new();
        for node in graph.nodes {
            primary.add_node(node)?;
        }
        for rel in graph.relationships {
            primary.add_relationship(rel)?;
        }
        Ok(primary)
    }

    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if node.id.trim().is_empty() {
            return Err(GraphVaultError::validation("node id must not be empty"));
        }
        if node.label.trim().is_empty() {
            return Err(GraphVaultError::validation(format!(
                "node {} has an empty label",
                node.id
            )));
        }

        match self.node_positions.get(&node.id) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.node_positions.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
        Ok(())
    }

    pub fn add_relationship(&mut self, rel: GraphRelationship) -> Result<()> {
        let missing = [
            ("id", &rel.id),
            ("type", &rel.rel_type),
            ("source", &rel.source),
            ("target", &rel.target),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());
        if let Some((field, _)) = missing {
            return Err(GraphVaultError::validation(format!(
                "relationship {} has an empty {}",
                rel.id, field
            )));
        }

        match self.relationship_positions.get(&rel.id) {
            Some(&pos) => self.relationships[pos] = rel,
            None => {
                self.relationship_positions
                    .insert(rel.id.clone(), self.relationships.len());
                self.relationships.push(rel);
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_positions.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[GraphRelationship] {
        &self.relationships
    }

    pub fn to_snapshot(&self) -> StoredGraph {
        StoredGraph::new(self.nodes.clone(), self.relationships.clone())
    }
}
