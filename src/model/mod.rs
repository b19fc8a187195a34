//! Domain types: entities (graph nodes) and relationships (directed edges).

mod entity;
mod relationship;

pub use entity::{AttributeValue, Entity, EntitySummary, NewEntity};
pub use relationship::{Direction, NewRelationship, Relationship, DEFAULT_CONFIDENCE};
