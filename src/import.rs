//! Bulk loading of entities and relationships from JSON files.
//!
//! Entity files hold `{"entities": [...]}` (or entities grouped by category,
//! `{"entities": {"ingredients": [...], ...}}`); relationship files hold
//! `{"relationships": [...]}`. Records are inserted in batches, one
//! transaction per batch.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::graph::validate_tag;
use crate::model::{AttributeValue, NewEntity, NewRelationship};
use crate::store::{clear_graph, entities, relationships};
use crate::{FlavorError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityList {
    Flat(Vec<Value>),
    Grouped(serde_json::Map<String, Value>),
}

#[derive(Debug, Deserialize)]
struct EntityFile {
    #[serde(default)]
    entities: Option<EntityList>,
}

#[derive(Debug, Deserialize)]
struct RelationshipFile {
    #[serde(default)]
    relationships: Vec<Value>,
}

/// Raw records read from the import files, before validation.
#[derive(Debug, Default, Clone)]
pub struct ImportSource {
    pub entities: Vec<Value>,
    pub relationships: Vec<Value>,
}

impl ImportSource {
    /// Read whichever files are given. Missing files are an error.
    pub fn from_files(entities: Option<&Path>, relationships: Option<&Path>) -> Result<Self> {
        let mut source = Self::default();
        if let Some(path) = entities {
            log::info!("Loading entities from {}", path.display());
            source.entities = parse_entity_file(&std::fs::read_to_string(path)?)?;
        }
        if let Some(path) = relationships {
            log::info!("Loading relationships from {}", path.display());
            source.relationships = parse_relationship_file(&std::fs::read_to_string(path)?)?;
        }
        Ok(source)
    }
}

pub fn parse_entity_file(json: &str) -> Result<Vec<Value>> {
    let file: EntityFile = serde_json::from_str(json)?;
    let records = match file.entities {
        None => Vec::new(),
        Some(EntityList::Flat(records)) => records,
        Some(EntityList::Grouped(groups)) => groups
            .into_iter()
            .flat_map(|(_, group)| match group {
                Value::Array(records) => records,
                _ => Vec::new(),
            })
            .collect(),
    };
    Ok(records)
}

pub fn parse_relationship_file(json: &str) -> Result<Vec<Value>> {
    let file: RelationshipFile = serde_json::from_str(json)?;
    Ok(file.relationships)
}

/// Import settings
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub drop_existing: bool,
}

/// Per-kind counts from one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    /// Records present in the source file
    pub source_count: usize,
    pub inserted: usize,
    /// Records missing a required field or carrying an unusable relationship type
    pub invalid: usize,
    /// Records with a field of the wrong shape
    pub malformed: usize,
    /// Entities whose id was already stored or appeared earlier in the file
    pub duplicates: usize,
    /// Rows in the store after the run
    pub db_count: i64,
}

impl ImportCounts {
    /// Whether the store holds exactly what the source file describes.
    pub fn matches_source(&self) -> bool {
        self.db_count == self.source_count as i64
    }

    fn skip(&mut self, kind: &str, record: &Value, err: &RecordError) {
        log::warn!("Skipping {} record ({}): {}", kind, err, record);
        if err.is_malformed() {
            self.malformed += 1;
        } else {
            self.invalid += 1;
        }
    }
}

/// Validation report produced at the end of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub entities: ImportCounts,
    pub relationships: ImportCounts,
    /// Relationships whose source or target has no stored entity
    pub dangling_relationships: i64,
}

impl ImportReport {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (kind, counts) in [("entities", &self.entities), ("relationships", &self.relationships)] {
            if counts.invalid > 0 {
                warnings.push(format!("{} {} skipped as invalid", counts.invalid, kind));
            }
            if counts.malformed > 0 {
                warnings.push(format!("{} {} skipped as malformed", counts.malformed, kind));
            }
            if counts.duplicates > 0 {
                warnings.push(format!("{} {} skipped as duplicates", counts.duplicates, kind));
            }
            if !counts.matches_source() {
                warnings.push(format!(
                    "{}: source has {} records but store holds {}",
                    kind, counts.source_count, counts.db_count
                ));
            }
        }
        if self.dangling_relationships > 0 {
            warnings.push(format!(
                "{} relationships reference entities that are not stored",
                self.dangling_relationships
            ));
        }
        warnings
    }
}

/// Why a source record was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("{0}")]
    InvalidType(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl RecordError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, RecordError::Malformed(_))
    }
}

fn required_str(record: &Value, key: &'static str) -> std::result::Result<String, RecordError> {
    match record.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RecordError::MissingField(key)),
    }
}

/// Build an insert payload from one source record.
pub fn entity_from_record(record: &Value) -> std::result::Result<NewEntity, RecordError> {
    let mut entity = NewEntity::new(
        required_str(record, "id")?,
        required_str(record, "name")?,
        required_str(record, "primary_classification")?,
    );

    if let Some(Value::Array(tags)) = record.get("classifications") {
        for tag in tags.iter().filter_map(Value::as_str) {
            entity = entity.with_classification(tag);
        }
    }

    if let Some(Value::Object(attributes)) = record.get("attributes") {
        for (key, raw) in attributes {
            entity.attributes.insert(key.clone(), attribute_from_record(raw));
        }
    }

    Ok(entity)
}

/// Accepts both `{"value": .., "source": .., "confidence": ..}` and bare values.
/// Objects with any other key are kept whole as the value.
fn attribute_from_record(raw: &Value) -> AttributeValue {
    match raw {
        Value::Object(map)
            if map.contains_key("value")
                && map.keys().all(|k| matches!(k.as_str(), "value" | "source" | "confidence")) =>
        {
            AttributeValue {
                value: map["value"].clone(),
                source: map.get("source").and_then(Value::as_str).map(str::to_string),
                confidence: map.get("confidence").and_then(confidence_level),
            }
        }
        _ => AttributeValue {
            value: raw.clone(),
            source: None,
            confidence: None,
        },
    }
}

/// Numeric or numeric-string confidence, rounded onto the 1-5 scale.
fn confidence_level(raw: &Value) -> Option<i64> {
    let score = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    score.is_finite().then(|| (score.round() as i64).clamp(1, 5))
}

pub fn relationship_from_record(record: &Value) -> std::result::Result<NewRelationship, RecordError> {
    required_str(record, "source_id")?;
    required_str(record, "target_id")?;
    let relationship_type = required_str(record, "relationship_type")?.trim().to_string();
    validate_tag(&relationship_type).map_err(|e| RecordError::InvalidType(e.to_string()))?;

    let Value::Object(mut map) = record.clone() else {
        return Err(RecordError::Malformed("relationship record is not an object".to_string()));
    };
    map.insert("relationship_type".to_string(), Value::String(relationship_type));

    for key in ["source_id", "target_id", "quantity", "unit", "source_reference"] {
        if let Some(Value::Number(n)) = map.get(key) {
            let text = n.to_string();
            map.insert(key.to_string(), Value::String(text));
        }
    }

    if let Some(Value::String(raw)) = map.get("confidence_score") {
        let score = raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| RecordError::Malformed(format!("confidence_score '{}' is not a number", raw)))?;
        map.insert("confidence_score".to_string(), Value::Number(score));
    }

    // null context/uncertainty/confidence fall back to their defaults
    for key in ["context", "uncertainty", "confidence_score"] {
        if map.get(key).is_some_and(Value::is_null) {
            map.remove(key);
        }
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| RecordError::Malformed(e.to_string()))
}

/// Insert entities in batches, one transaction per batch.
pub fn import_entities(conn: &mut Connection, records: &[Value], batch_size: usize) -> Result<ImportCounts> {
    let mut seen: HashSet<String> = entities::entity_ids(conn)?.into_iter().collect();
    let mut counts = ImportCounts {
        source_count: records.len(),
        ..ImportCounts::default()
    };

    for (batch_index, batch) in records.chunks(batch_size.max(1)).enumerate() {
        let tx = conn.transaction()?;
        for record in batch {
            let entity = match entity_from_record(record) {
                Ok(entity) => entity,
                Err(err) => {
                    counts.skip("entity", record, &err);
                    continue;
                }
            };
            if !seen.insert(entity.id.clone()) || !entities::insert_entity(&tx, &entity)? {
                counts.duplicates += 1;
                continue;
            }
            counts.inserted += 1;
        }
        tx.commit()?;
        log::info!("Imported entity batch {} ({} records)", batch_index + 1, batch.len());
    }

    counts.db_count = entities::count_entities(conn)?;
    Ok(counts)
}

/// Insert relationships in batches, one transaction per batch.
pub fn import_relationships(conn: &mut Connection, records: &[Value], batch_size: usize) -> Result<ImportCounts> {
    let mut counts = ImportCounts {
        source_count: records.len(),
        ..ImportCounts::default()
    };

    for (batch_index, batch) in records.chunks(batch_size.max(1)).enumerate() {
        let tx = conn.transaction()?;
        for record in batch {
            match relationship_from_record(record) {
                Ok(relationship) => {
                    relationships::insert_relationship(&tx, &relationship)?;
                    counts.inserted += 1;
                }
                Err(err) => counts.skip("relationship", record, &err),
            }
        }
        tx.commit()?;
        log::info!("Imported relationship batch {} ({} records)", batch_index + 1, batch.len());
    }

    counts.db_count = relationships::count_relationships(conn)?;
    Ok(counts)
}

/// Load `source` into the store and report how the store compares to it.
pub fn run_import(conn: &mut Connection, source: &ImportSource, options: ImportOptions) -> Result<ImportReport> {
    if options.batch_size == 0 {
        return Err(FlavorError::InvalidParameter("batch size must be greater than 0".to_string()));
    }

    if options.drop_existing {
        let tx = conn.transaction()?;
        clear_graph(&tx)?;
        tx.commit()?;
    }

    let mut report = ImportReport {
        entities: import_entities(conn, &source.entities, options.batch_size)?,
        relationships: import_relationships(conn, &source.relationships, options.batch_size)?,
        ..ImportReport::default()
    };
    report.dangling_relationships = relationships::count_dangling(conn)?;

    log::info!(
        "Import finished: {} entities, {} relationships inserted",
        report.entities.inserted,
        report.relationships.inserted
    );
    Ok(report)
}
