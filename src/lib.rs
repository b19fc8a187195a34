pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod import;
pub mod model;
pub mod store;

pub use config::Config;
pub use error::{FlavorError, Result};
pub use graph::{find_path, get_connections, RelationshipFilter, SearchLimits};
