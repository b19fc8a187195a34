//! Relationship graph search: bounded-depth neighborhood exploration and
//! shortest-path lookup over directed, typed edges.
//!
//! Edges are stored directed but traversed in both directions, since "is
//! connected to" is symmetric. Every search keeps a visited set keyed by
//! entity id, so cycles and parallel edges are safe.

use std::time::{Duration, Instant};

mod filter;
mod path;
mod source;
mod traversal;

#[cfg(test)]
pub(crate) mod memory;

pub use filter::{validate_tag, RelationshipFilter};
pub use path::{find_path, PathStep, RelationshipPath};
pub use source::{neighbors, EdgeSource, Neighbor};
pub use traversal::{get_connections, Connections, Level, TraversedEdge};

/// Resource guard for a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum number of distinct entities (including the start) one search may visit.
    pub max_visited: usize,
    /// Wall-clock instant after which the search gives up.
    pub deadline: Option<Instant>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_visited: 10_000,
            deadline: None,
        }
    }
}

impl SearchLimits {
    /// Give up once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub(crate) fn check(&self, visited: usize) -> crate::Result<()> {
        if visited > self.max_visited {
            return Err(crate::FlavorError::SearchLimitExceeded {
                limit: self.max_visited,
            });
        }
        Ok(())
    }

    /// Checked once per expanded entity.
    pub(crate) fn check_deadline(&self) -> crate::Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(crate::FlavorError::SearchTimedOut),
            _ => Ok(()),
        }
    }
}
