//! Level-by-level BFS around one entity.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::model::Relationship;
use crate::{FlavorError, Result};

use super::{neighbors, EdgeSource, RelationshipFilter, SearchLimits};

/// Entities first reached at a given depth, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub depth: usize,
    pub entity_ids: Vec<String>,
}

/// An edge examined while expanding an entity at `depth - 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversedEdge {
    pub depth: usize,
    pub relationship: Relationship,
}

/// The neighborhood of an entity up to a depth bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connections {
    pub entity_id: String,
    pub max_depth: usize,
    /// Non-empty levels only, ascending by depth. The start entity is never listed.
    pub levels: Vec<Level>,
    /// Every traversed edge exactly once, in traversal order.
    pub edges: Vec<TraversedEdge>,
}

impl Connections {
    /// Number of distinct entities discovered, excluding the start.
    pub fn entity_count(&self) -> usize {
        self.levels.iter().map(|l| l.entity_ids.len()).sum()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.depth_of(entity_id).is_some()
    }

    /// Depth at which `entity_id` was first reached.
    pub fn depth_of(&self, entity_id: &str) -> Option<usize> {
        self.levels
            .iter()
            .find(|l| l.entity_ids.iter().any(|id| id == entity_id))
            .map(|l| l.depth)
    }

    /// All discovered entity ids, level by level.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .flat_map(|l| l.entity_ids.iter().map(String::as_str))
    }

    /// Distinct relationship types among the traversed edges, sorted.
    pub fn relationship_types_found(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|e| e.relationship.relationship_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Explore the graph around `entity_id` up to `max_depth` hops.
///
/// Each level expands every entity of the previous level through both its
/// outgoing and incoming edges that pass `filter`. An entity is expanded at
/// most once and listed only at the depth where it was first reached.
/// A `max_depth` of 0 yields no levels.
pub fn get_connections<S>(
    source: &S,
    entity_id: &str,
    filter: &RelationshipFilter,
    max_depth: usize,
    limits: &SearchLimits,
) -> Result<Connections>
where
    S: EdgeSource + ?Sized,
{
    if !source.entity_exists(entity_id)? {
        return Err(FlavorError::EntityNotFound(entity_id.to_string()));
    }

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(entity_id.to_string());
    let mut seen_edges: HashSet<i64> = HashSet::new();

    let mut frontier = vec![entity_id.to_string()];
    let mut levels = Vec::new();
    let mut edges = Vec::new();

    for depth in 1..=max_depth {
        if frontier.is_empty() {
            break;
        }

        let mut next = Vec::new();
        for current in &frontier {
            limits.check_deadline()?;
            for neighbor in neighbors(source, current, filter)? {
                if visited.insert(neighbor.entity_id.clone()) {
                    limits.check(visited.len())?;
                    next.push(neighbor.entity_id);
                }
                if seen_edges.insert(neighbor.edge.id) {
                    edges.push(TraversedEdge {
                        depth,
                        relationship: neighbor.edge,
                    });
                }
            }
        }

        if !next.is_empty() {
            levels.push(Level {
                depth,
                entity_ids: next.clone(),
            });
        }
        frontier = next;
    }

    log::debug!(
        "connections for {}: depth={} visited={} edges={}",
        entity_id,
        max_depth,
        visited.len(),
        edges.len()
    );

    Ok(Connections {
        entity_id: entity_id.to_string(),
        max_depth,
        levels,
        edges,
    })
}
