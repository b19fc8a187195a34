//! In-memory edge source used by the graph tests.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::model::Relationship;
use crate::Result;

use super::{EdgeSource, RelationshipFilter};

#[derive(Debug, Default)]
pub(crate) struct MemoryGraph {
    entities: BTreeSet<String>,
    edges: Vec<Relationship>,
}

impl MemoryGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entities<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Add an edge; ids are assigned in insertion order starting at 1.
    pub(crate) fn edge(mut self, source: &str, target: &str, relationship_type: &str, confidence: f64) -> Self {
        let now = Utc::now();
        self.edges.push(Relationship {
            id: self.edges.len() as i64 + 1,
            source_id: source.to_string(),
            target_id: target.to_string(),
            relationship_type: relationship_type.to_string(),
            quantity: None,
            unit: None,
            context: serde_json::json!({}),
            uncertainty: serde_json::json!({}),
            source_reference: None,
            confidence_score: confidence,
            created_at: now,
            updated_at: now,
        });
        self
    }
}

impl EdgeSource for MemoryGraph {
    fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        Ok(self.entities.contains(entity_id))
    }

    fn outgoing_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.source_id == entity_id && filter.matches(&e.relationship_type))
            .cloned()
            .collect())
    }

    fn incoming_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.target_id == entity_id && filter.matches(&e.relationship_type))
            .cloned()
            .collect())
    }
}
