//! Shortest relationship path between two entities.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::model::{Direction, Relationship};
use crate::{FlavorError, Result};

use super::{neighbors, EdgeSource, RelationshipFilter, SearchLimits};

/// One hop of a path: the edge and the way it was walked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub relationship: Relationship,
    pub direction: Direction,
}

impl PathStep {
    /// Entity this step arrives at.
    pub fn to_entity(&self) -> &str {
        match self.direction {
            Direction::Outgoing => &self.relationship.target_id,
            Direction::Incoming => &self.relationship.source_id,
        }
    }
}

/// Ordered edges leading from `source_id` to `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipPath {
    pub source_id: String,
    pub target_id: String,
    pub steps: Vec<PathStep>,
}

impl RelationshipPath {
    /// The zero-length path from an entity to itself.
    pub fn trivial(entity_id: &str) -> Self {
        Self {
            source_id: entity_id.to_string(),
            target_id: entity_id.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_confidence(&self) -> f64 {
        self.steps
            .iter()
            .fold(0.0, |total, s| total + s.relationship.confidence_score)
    }

    /// Mean confidence per edge; 0.0 for the trivial path.
    pub fn avg_confidence(&self) -> f64 {
        if self.steps.is_empty() {
            0.0
        } else {
            self.total_confidence() / self.steps.len() as f64
        }
    }
}

/// Find a shortest (by hop count) path from `source_id` to `target_id`
/// within `max_depth` hops, walking edges in either direction.
///
/// Returns `Ok(None)` when no path exists within the bound. Unknown entity
/// ids are an error. The search ends as soon as the target is discovered. Among equally short paths the first one discovered wins:
/// the frontier is processed in insertion order and each entity's neighbors in
/// [`neighbors`] order, so identical data always gives the same path.
pub fn find_path<S>(
    source: &S,
    source_id: &str,
    target_id: &str,
    max_depth: usize,
    limits: &SearchLimits,
) -> Result<Option<RelationshipPath>>
where
    S: EdgeSource + ?Sized,
{
    for id in [source_id, target_id] {
        if !source.entity_exists(id)? {
            return Err(FlavorError::EntityNotFound(id.to_string()));
        }
    }

    if source_id == target_id {
        return Ok(Some(RelationshipPath::trivial(source_id)));
    }

    let filter = RelationshipFilter::all();
    // entity -> (predecessor, step that reached it)
    let mut predecessors: HashMap<String, (String, PathStep)> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(source_id.to_string());
    queue.push_back((source_id.to_string(), 0usize));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        limits.check_deadline()?;

        for neighbor in neighbors(source, &current, &filter)? {
            if !visited.insert(neighbor.entity_id.clone()) {
                continue;
            }
            let step = PathStep {
                relationship: neighbor.edge,
                direction: neighbor.direction,
            };
            predecessors.insert(neighbor.entity_id.clone(), (current.clone(), step));

            // First discovery is at the shortest distance, so stop before the guard can fire
            if neighbor.entity_id == target_id {
                let path = reconstruct(&predecessors, source_id, target_id);
                log::debug!(
                    "path {} -> {}: {} hops, visited={}",
                    source_id,
                    target_id,
                    path.len(),
                    visited.len()
                );
                return Ok(Some(path));
            }

            limits.check(visited.len())?;
            queue.push_back((neighbor.entity_id, depth + 1));
        }
    }

    log::debug!(
        "no path {} -> {} within {} hops, visited={}",
        source_id,
        target_id,
        max_depth,
        visited.len()
    );
    Ok(None)
}

fn reconstruct(
    predecessors: &HashMap<String, (String, PathStep)>,
    source_id: &str,
    target_id: &str,
) -> RelationshipPath {
    let mut steps = Vec::new();
    let mut current = target_id;
    while current != source_id {
        match predecessors.get(current) {
            Some((previous, step)) => {
                steps.push(step.clone());
                current = previous.as_str();
            }
            None => break,
        }
    }
    steps.reverse();

    RelationshipPath {
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        steps,
    }
}
