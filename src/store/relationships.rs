//! Relationship Store queries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::graph::RelationshipFilter;
use crate::model::{NewRelationship, Relationship};
use crate::{FlavorError, Result};

use super::{json_column, placeholders};

const RELATIONSHIP_COLUMNS: &str = "id, source_id, target_id, relationship_type, quantity, unit, \
     context, uncertainty, source_reference, confidence_score, created_at, updated_at";

/// Which incident edges of an entity to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    Incoming,
    Outgoing,
    #[default]
    Both,
}

impl EdgeDirection {
    pub fn includes_incoming(self) -> bool {
        matches!(self, EdgeDirection::Incoming | EdgeDirection::Both)
    }

    pub fn includes_outgoing(self) -> bool {
        matches!(self, EdgeDirection::Outgoing | EdgeDirection::Both)
    }
}

impl FromStr for EdgeDirection {
    type Err = FlavorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incoming" => Ok(EdgeDirection::Incoming),
            "outgoing" => Ok(EdgeDirection::Outgoing),
            "both" => Ok(EdgeDirection::Both),
            other => Err(FlavorError::InvalidParameter(format!(
                "direction must be one of incoming, outgoing, both; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeDirection::Incoming => "incoming",
            EdgeDirection::Outgoing => "outgoing",
            EdgeDirection::Both => "both",
        };
        f.write_str(name)
    }
}

/// Edges incident to one entity, split by orientation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityEdges {
    pub incoming: Vec<Relationship>,
    pub outgoing: Vec<Relationship>,
}

impl EntityEdges {
    pub fn total(&self) -> usize {
        self.incoming.len() + self.outgoing.len()
    }

    /// Distinct relationship types across both lists, sorted.
    pub fn relationship_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .incoming
            .iter()
            .chain(self.outgoing.iter())
            .map(|r| r.relationship_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Number of stored edges carrying one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub count: i64,
}

/// Counts over the whole relationship table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipStats {
    pub total_relationships: i64,
    pub by_type: BTreeMap<String, i64>,
    /// Edge counts keyed by confidence score, e.g. `"3.0"`
    pub by_confidence: BTreeMap<String, i64>,
    pub avg_confidence: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relationship_type: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        context: json_column(row, 6)?,
        uncertainty: json_column(row, 7)?,
        source_reference: row.get(8)?,
        confidence_score: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Insert a relationship and return its assigned id.
///
/// Endpoints are not checked against the entity table.
pub fn insert_relationship(conn: &Connection, relationship: &NewRelationship) -> Result<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO relationships \
         (source_id, target_id, relationship_type, quantity, unit, context, uncertainty, \
          source_reference, confidence_score, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            relationship.source_id,
            relationship.target_id,
            relationship.relationship_type,
            relationship.quantity,
            relationship.unit,
            serde_json::to_string(&relationship.context)?,
            serde_json::to_string(&relationship.uncertainty)?,
            relationship.source_reference,
            relationship.confidence_score,
            now,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_relationship(conn: &Connection, relationship_id: i64) -> Result<Option<Relationship>> {
    let relationship = conn
        .query_row(
            &format!("SELECT {} FROM relationships WHERE id = ?1", RELATIONSHIP_COLUMNS),
            [relationship_id],
            relationship_from_row,
        )
        .optional()?;
    Ok(relationship)
}

/// Edges whose source is `entity_id`, ascending by id.
pub fn outgoing_edges(conn: &Connection, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
    edges_by_endpoint(conn, "source_id", entity_id, filter, None)
}

/// Edges whose target is `entity_id`, ascending by id.
pub fn incoming_edges(conn: &Connection, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
    edges_by_endpoint(conn, "target_id", entity_id, filter, None)
}

fn edges_by_endpoint(
    conn: &Connection,
    column: &str,
    entity_id: &str,
    filter: &RelationshipFilter,
    limit: Option<usize>,
) -> Result<Vec<Relationship>> {
    let mut sql = format!(
        "SELECT {} FROM relationships WHERE {} = ?1",
        RELATIONSHIP_COLUMNS, column
    );
    let mut values = vec![entity_id.to_string()];

    if let Some(types) = filter.types() {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(&format!(" AND relationship_type IN ({})", placeholders(2, types.len())));
        values.extend(types.into_iter().map(str::to_string));
    }

    sql.push_str(" ORDER BY id");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let edges = stmt
        .query_map(params_from_iter(values.iter()), relationship_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(edges)
}

/// Incident edges of one entity, each list capped at `limit`.
pub fn entity_relationships(
    conn: &Connection,
    entity_id: &str,
    filter: &RelationshipFilter,
    direction: EdgeDirection,
    limit: usize,
) -> Result<EntityEdges> {
    let mut edges = EntityEdges::default();
    if direction.includes_incoming() {
        edges.incoming = edges_by_endpoint(conn, "target_id", entity_id, filter, Some(limit))?;
    }
    if direction.includes_outgoing() {
        edges.outgoing = edges_by_endpoint(conn, "source_id", entity_id, filter, Some(limit))?;
    }
    Ok(edges)
}

/// Every relationship type in use with its edge count, sorted by type.
pub fn relationship_types(conn: &Connection) -> Result<Vec<TypeCount>> {
    let mut stmt = conn.prepare(
        "SELECT relationship_type, COUNT(*) FROM relationships \
         GROUP BY relationship_type ORDER BY relationship_type",
    )?;
    let types = stmt
        .query_map([], |row| {
            Ok(TypeCount {
                relationship_type: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(types)
}

pub fn count_relationships(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?)
}

/// Relationships whose source or target has no stored entity.
pub fn count_dangling(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM relationships r \
         WHERE NOT EXISTS (SELECT 1 FROM entities e WHERE e.id = r.source_id) \
            OR NOT EXISTS (SELECT 1 FROM entities e WHERE e.id = r.target_id)",
        [],
        |row| row.get(0),
    )?)
}

pub fn relationship_statistics(conn: &Connection) -> Result<RelationshipStats> {
    let by_type: BTreeMap<String, i64> = relationship_types(conn)?
        .into_iter()
        .map(|t| (t.relationship_type, t.count))
        .collect();

    let (avg_confidence, last_updated): (Option<f64>, Option<DateTime<Utc>>) = conn.query_row(
        "SELECT AVG(confidence_score), MAX(updated_at) FROM relationships",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT confidence_score, COUNT(*) FROM relationships \
         GROUP BY confidence_score ORDER BY confidence_score",
    )?;
    let by_confidence = stmt
        .query_map([], |row| Ok((format!("{:?}", row.get::<_, f64>(0)?), row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<BTreeMap<_, _>, rusqlite::Error>>()?;

    Ok(RelationshipStats {
        total_relationships: by_type.values().sum(),
        by_type,
        by_confidence,
        avg_confidence: avg_confidence.unwrap_or(0.0),
        last_updated,
    })
}
