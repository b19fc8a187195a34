use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence assigned when a relationship does not state one.
pub const DEFAULT_CONFIDENCE: f64 = 3.0;

/// A directed, typed, confidence-scored edge (source --relationship_type--> target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub source_id: String,
    pub target_id: String,
    /// Edge tag, e.g. `contains`, `found_in`.
    pub relationship_type: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    /// Free-form context such as preparation state or mechanisms.
    pub context: serde_json::Value,
    /// Free-form uncertainty data (mean, sd, min, max).
    pub uncertainty: serde_json::Value,
    pub source_reference: Option<String>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// The endpoint opposite `entity_id`. For a self-loop this is `entity_id` itself.
    pub fn other_end(&self, entity_id: &str) -> &str {
        if self.source_id == entity_id {
            &self.target_id
        } else {
            &self.source_id
        }
    }

    pub fn quantity_with_unit(&self) -> String {
        match (&self.quantity, &self.unit) {
            (Some(quantity), Some(unit)) => format!("{} {}", quantity, unit),
            (Some(quantity), None) => quantity.clone(),
            _ => "unknown".to_string(),
        }
    }
}

/// Which way an edge was walked, relative to the entity being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Followed from its source to its target.
    Outgoing,
    /// Followed backwards, from its target to its source.
    Incoming,
}

/// Insert payload for a relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelationship {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "empty_object")]
    pub context: serde_json::Value,
    #[serde(default = "empty_object")]
    pub uncertainty: serde_json::Value,
    #[serde(default)]
    pub source_reference: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
}

impl NewRelationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
            quantity: None,
            unit: None,
            context: empty_object(),
            uncertainty: empty_object(),
            source_reference: None,
            confidence_score,
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edge(source: &str, target: &str) -> Relationship {
        let now = Utc::now();
        Relationship {
            id: 1,
            source_id: source.to_string(),
            target_id: target.to_string(),
            relationship_type: "contains".to_string(),
            quantity: Some("12".to_string()),
            unit: Some("mg".to_string()),
            context: json!({}),
            uncertainty: json!({}),
            source_reference: None,
            confidence_score: 0.9,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_other_end() {
        let rel = edge("garlic", "allicin");
        assert_eq!(rel.other_end("garlic"), "allicin");
        assert_eq!(rel.other_end("allicin"), "garlic");

        let self_loop = edge("garlic", "garlic");
        assert_eq!(self_loop.other_end("garlic"), "garlic");
    }

    #[test]
    fn test_quantity_with_unit() {
        let mut rel = edge("a", "b");
        assert_eq!(rel.quantity_with_unit(), "12 mg");
        rel.unit = None;
        assert_eq!(rel.quantity_with_unit(), "12");
        rel.quantity = None;
        assert_eq!(rel.quantity_with_unit(), "unknown");
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Direction::Outgoing).unwrap(), json!("outgoing"));
        assert_eq!(serde_json::to_value(Direction::Incoming).unwrap(), json!("incoming"));
    }

    #[test]
    fn test_new_relationship_defaults() {
        let rel: NewRelationship = serde_json::from_value(json!({
            "source_id": "garlic",
            "target_id": "allicin",
            "relationship_type": "contains"
        }))
        .unwrap();
        assert_eq!(rel.confidence_score, DEFAULT_CONFIDENCE);
        assert_eq!(rel.context, json!({}));
        assert_eq!(rel.uncertainty, json!({}));
        assert!(rel.quantity.is_none());
    }
}
