//! Response bodies for the HTTP endpoints.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{Connections, RelationshipPath};
use crate::model::{Direction, EntitySummary, Relationship};
use crate::store::entities::EntityStats;
use crate::store::relationships::{EntityEdges, TypeCount};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// An entity as listed in search output. Name and classification are null
/// when an edge points at an id with no stored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: Option<String>,
    pub primary_classification: Option<String>,
}

impl EntityRef {
    fn resolve(id: &str, summaries: &HashMap<String, EntitySummary>) -> Self {
        match summaries.get(id) {
            Some(summary) => Self {
                id: summary.id.clone(),
                name: Some(summary.name.clone()),
                primary_classification: Some(summary.primary_classification.clone()),
            },
            None => Self {
                id: id.to_string(),
                name: None,
                primary_classification: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelResponse {
    pub depth: usize,
    pub entities: Vec<EntityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEdge {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub depth: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub entity_id: String,
    pub entity_name: Option<String>,
    pub max_depth: usize,
    /// The requested type filter, or null when every type was traversed.
    pub relationship_types: Option<Vec<String>>,
    pub levels: Vec<LevelResponse>,
    pub edges: Vec<ConnectionEdge>,
    pub total_connections: usize,
    pub total_edges: usize,
    pub relationship_types_found: Vec<String>,
}

impl ConnectionsResponse {
    pub fn new(
        connections: Connections,
        requested_types: Option<Vec<String>>,
        summaries: &HashMap<String, EntitySummary>,
    ) -> Self {
        let total_connections = connections.entity_count();
        let relationship_types_found = connections.relationship_types_found();
        let levels = connections
            .levels
            .iter()
            .map(|level| LevelResponse {
                depth: level.depth,
                entities: level
                    .entity_ids
                    .iter()
                    .map(|id| EntityRef::resolve(id, summaries))
                    .collect(),
            })
            .collect();
        let edges: Vec<ConnectionEdge> = connections
            .edges
            .into_iter()
            .map(|e| ConnectionEdge {
                relationship: e.relationship,
                depth: e.depth,
            })
            .collect();

        Self {
            entity_name: summaries.get(&connections.entity_id).map(|s| s.name.clone()),
            entity_id: connections.entity_id,
            max_depth: connections.max_depth,
            relationship_types: requested_types,
            levels,
            total_connections,
            total_edges: edges.len(),
            edges,
            relationship_types_found,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEdge {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub direction: Direction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathResponse {
    pub source_id: String,
    pub target_id: String,
    pub path: Vec<PathEdge>,
    pub path_length: usize,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PathResponse {
    pub fn found(path: RelationshipPath) -> Self {
        let total_confidence = path.total_confidence();
        let avg_confidence = path.avg_confidence();
        let path_length = path.len();
        Self {
            source_id: path.source_id,
            target_id: path.target_id,
            path: path
                .steps
                .into_iter()
                .map(|step| PathEdge {
                    relationship: step.relationship,
                    direction: step.direction,
                })
                .collect(),
            path_length,
            found: true,
            total_confidence: Some(total_confidence),
            avg_confidence: Some(avg_confidence),
            message: None,
        }
    }

    pub fn not_found(source_id: String, target_id: String) -> Self {
        Self {
            source_id,
            target_id,
            path: Vec::new(),
            path_length: 0,
            found: false,
            total_confidence: None,
            avg_confidence: None,
            message: Some("No relationship path found".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectConnectionsResponse {
    pub entity_id: String,
    pub entity_name: String,
    pub incoming_relationships: Vec<Relationship>,
    pub outgoing_relationships: Vec<Relationship>,
    pub total_connections: usize,
    pub relationship_types: Vec<String>,
}

impl DirectConnectionsResponse {
    pub fn new(entity_id: String, entity_name: String, edges: EntityEdges) -> Self {
        Self {
            entity_id,
            entity_name,
            total_connections: edges.total(),
            relationship_types: edges.relationship_types(),
            incoming_relationships: edges.incoming,
            outgoing_relationships: edges.outgoing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RelationshipTypesResponse {
    pub total_types: usize,
    pub relationship_types: Vec<TypeCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntityStatsResponse {
    pub total_entities: i64,
    pub by_classification: BTreeMap<String, i64>,
    pub by_primary_classification: BTreeMap<String, i64>,
    /// Entities created in the last 30 days
    pub recent_additions: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<EntityStats> for EntityStatsResponse {
    fn from(stats: EntityStats) -> Self {
        Self {
            total_entities: stats.total_entities,
            by_primary_classification: stats.by_classification.clone(),
            by_classification: stats.by_classification,
            recent_additions: stats.recent_additions,
            last_updated: stats.last_updated,
        }
    }
}
