//! The edge source seam between graph search and storage.

use crate::model::{Direction, Relationship};
use crate::Result;

use super::RelationshipFilter;

/// Read access to entities and their edges.
///
/// Implementations must return edges in a stable order (the SQLite store uses
/// ascending edge id) so that searches are reproducible for identical data.
pub trait EdgeSource {
    fn entity_exists(&self, entity_id: &str) -> Result<bool>;

    /// Edges whose source is `entity_id`.
    fn outgoing_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>>;

    /// Edges whose target is `entity_id`.
    fn incoming_edges(&self, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>>;
}

/// An adjacent entity together with the edge that reaches it.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub entity_id: String,
    pub direction: Direction,
    pub edge: Relationship,
}

/// All entities one edge away from `entity_id`, in either direction.
///
/// Outgoing edges come first, then incoming ones, each in source order.
/// A self-loop shows up in both lists.
pub fn neighbors<S>(source: &S, entity_id: &str, filter: &RelationshipFilter) -> Result<Vec<Neighbor>>
where
    S: EdgeSource + ?Sized,
{
    let outgoing = source.outgoing_edges(entity_id, filter)?;
    let incoming = source.incoming_edges(entity_id, filter)?;

    let mut result = Vec::with_capacity(outgoing.len() + incoming.len());
    for edge in outgoing {
        result.push(Neighbor {
            entity_id: edge.target_id.clone(),
            direction: Direction::Outgoing,
            edge,
        });
    }
    for edge in incoming {
        result.push(Neighbor {
            entity_id: edge.source_id.clone(),
            direction: Direction::Incoming,
            edge,
        });
    }
    Ok(result)
}
