//! SQLite-backed Entity Store and Relationship Store.
//!
//! All functions are synchronous over a borrowed connection; callers run them
//! inside [`crate::db::Db::with_connection`].

pub mod entities;
pub mod relationships;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;

use crate::graph::{EdgeSource, RelationshipFilter};
use crate::model::Relationship;
use crate::Result;

/// Adapts a connection to the graph search's [`EdgeSource`] seam.
pub struct SqliteGraph<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteGraph<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl EdgeSource for SqliteGraph<'_> {
    fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        entities::entity_exists(self.conn, entity_id)
    }

    fn outgoing_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
        relationships::outgoing_edges(self.conn, entity_id, filter)
    }

    fn incoming_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
        relationships::incoming_edges(self.conn, entity_id, filter)
    }
}

/// Delete every relationship and entity.
pub fn clear_graph(conn: &Connection) -> Result<(usize, usize)> {
    let relationships = conn.execute("DELETE FROM relationships", [])?;
    let entities = conn.execute("DELETE FROM entities", [])?;
    log::info!("Cleared {} entities and {} relationships", entities, relationships);
    Ok((entities, relationships))
}

/// Decode a JSON text column.
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `?N, ?N+1, ...` placeholders for an IN list starting at parameter `first`.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
