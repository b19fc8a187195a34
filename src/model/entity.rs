use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single attribute value with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub value: serde_json::Value,
    #[serde(default)]
    pub source: Option<String>,
    /// Confidence on a 1-5 scale, when known.
    #[serde(default)]
    pub confidence: Option<i64>,
}

/// A node in the domain graph: ingredient, nutrient, compound, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub primary_classification: String,
    pub classifications: Vec<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Raw value of an attribute, ignoring source and confidence.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key).map(|a| &a.value)
    }

    pub fn is_ingredient(&self) -> bool {
        self.primary_classification == "ingredient"
    }

    pub fn is_nutrient(&self) -> bool {
        self.primary_classification == "nutrient"
    }

    pub fn is_compound(&self) -> bool {
        self.primary_classification == "compound"
    }
}

/// The identifying fields of an entity, as listed in search output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: String,
    pub name: String,
    pub primary_classification: String,
}

/// Insert payload for an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntity {
    pub id: String,
    pub name: String,
    pub primary_classification: String,
    #[serde(default)]
    pub classifications: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl NewEntity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        primary_classification: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary_classification: primary_classification.into(),
            classifications: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a classification tag, ignoring duplicates.
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        let classification = classification.into();
        if !self.classifications.contains(&classification) {
            self.classifications.push(classification);
        }
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
        source: Option<String>,
        confidence: Option<i64>,
    ) -> Self {
        self.attributes.insert(key.into(), AttributeValue { value, source, confidence });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn garlic() -> Entity {
        let now = Utc::now();
        Entity {
            id: "garlic".to_string(),
            name: "Garlic".to_string(),
            primary_classification: "ingredient".to_string(),
            classifications: vec!["vegetable".to_string()],
            attributes: NewEntity::new("garlic", "Garlic", "ingredient")
                .with_attribute("allicin_mg", json!(4.5), Some("usda".to_string()), Some(4))
                .attributes,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_attribute_lookup() {
        let entity = garlic();
        assert_eq!(entity.attribute("allicin_mg"), Some(&json!(4.5)));
        assert!(entity.attribute("missing").is_none());
    }

    #[test]
    fn test_classification_helpers() {
        let entity = garlic();
        assert!(entity.is_ingredient());
        assert!(!entity.is_nutrient());
        assert!(!entity.is_compound());
    }

    #[test]
    fn test_with_classification_deduplicates() {
        let entity = NewEntity::new("x", "X", "compound")
            .with_classification("sulfur")
            .with_classification("sulfur");
        assert_eq!(entity.classifications, vec!["sulfur".to_string()]);
    }

    #[test]
    fn test_new_entity_deserialize_defaults() {
        let entity: NewEntity = serde_json::from_value(json!({
            "id": "vitamin_c",
            "name": "Vitamin C",
            "primary_classification": "nutrient"
        }))
        .unwrap();
        assert!(entity.classifications.is_empty());
        assert!(entity.attributes.is_empty());
    }
}
