//! Entity Store queries.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::model::{Entity, EntitySummary, NewEntity};
use crate::Result;

use super::{json_column, placeholders};

// Stay well below SQLITE_MAX_VARIABLE_NUMBER
const LOOKUP_CHUNK: usize = 500;

pub const RECENT_WINDOW_DAYS: i64 = 30;

const ENTITY_COLUMNS: &str =
    "id, name, primary_classification, classifications, attributes, created_at, updated_at";

/// Counts over the whole entity table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStats {
    pub total_entities: i64,
    pub by_classification: BTreeMap<String, i64>,
    /// Entities created within [`RECENT_WINDOW_DAYS`]
    pub recent_additions: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        primary_classification: row.get(2)?,
        classifications: json_column(row, 3)?,
        attributes: json_column(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert an entity unless its id is already stored. Returns whether a row was written.
pub fn insert_entity(conn: &Connection, entity: &NewEntity) -> Result<bool> {
    let now = Utc::now();
    let changed = conn.execute(
        "INSERT OR IGNORE INTO entities \
         (id, name, primary_classification, classifications, attributes, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entity.id,
            entity.name,
            entity.primary_classification,
            serde_json::to_string(&entity.classifications)?,
            serde_json::to_string(&entity.attributes)?,
            now,
            now,
        ],
    )?;
    Ok(changed == 1)
}

pub fn get_entity(conn: &Connection, entity_id: &str) -> Result<Option<Entity>> {
    let entity = conn
        .query_row(
            &format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS),
            [entity_id],
            entity_from_row,
        )
        .optional()?;
    Ok(entity)
}

pub fn entity_exists(conn: &Connection, entity_id: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM entities WHERE id = ?1")?;
    Ok(stmt.exists([entity_id])?)
}

/// Summaries for the given ids; ids with no stored entity are absent from the map.
pub fn get_summaries(conn: &Connection, ids: &[String]) -> Result<HashMap<String, EntitySummary>> {
    let mut summaries = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(LOOKUP_CHUNK) {
        let sql = format!(
            "SELECT id, name, primary_classification FROM entities WHERE id IN ({})",
            placeholders(1, chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok(EntitySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                primary_classification: row.get(2)?,
            })
        })?;
        for row in rows {
            let summary = row?;
            summaries.insert(summary.id.clone(), summary);
        }
    }
    Ok(summaries)
}

pub fn count_entities(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?)
}

/// All stored entity ids, used to skip duplicates during import.
pub fn entity_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM entities ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(ids)
}

pub fn entity_statistics(conn: &Connection) -> Result<EntityStats> {
    let mut stmt = conn.prepare(
        "SELECT primary_classification, COUNT(*) FROM entities \
         GROUP BY primary_classification ORDER BY primary_classification",
    )?;
    let by_classification = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<BTreeMap<_, _>, rusqlite::Error>>()?;

    let last_updated: Option<DateTime<Utc>> =
        conn.query_row("SELECT MAX(updated_at) FROM entities", [], |row| row.get(0))?;

    let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let recent_additions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entities WHERE created_at >= ?1",
        [since],
        |row| row.get(0),
    )?;

    Ok(EntityStats {
        total_entities: by_classification.values().sum(),
        by_classification,
        recent_additions,
        last_updated,
    })
}
