use thiserror::Error;

/// Main error type for FlavorGraph
#[derive(Error, Debug)]
pub enum FlavorError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking database task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// Entity id does not resolve to a stored entity
    #[error("Entity with ID '{0}' not found")]
    EntityNotFound(String),

    /// Relationship id does not resolve to a stored relationship
    #[error("Relationship with ID '{0}' not found")]
    RelationshipNotFound(i64),

    /// Request parameter outside its allowed range or format
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A graph search visited more entities than allowed
    #[error("Search aborted: more than {limit} entities reachable within the requested depth")]
    SearchLimitExceeded { limit: usize },

    /// A graph search ran past its deadline
    #[error("Search aborted: request time limit reached")]
    SearchTimedOut,
}

impl FlavorError {
    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlavorError::Database(_) => "database_error",
            FlavorError::Io(_) => "io_error",
            FlavorError::Serialization(_) => "serialization_error",
            FlavorError::Config(_) => "config_error",
            FlavorError::Task(_) => "task_error",
            FlavorError::EntityNotFound(_) | FlavorError::RelationshipNotFound(_) => "not_found",
            FlavorError::InvalidParameter(_) => "invalid_parameter",
            FlavorError::SearchLimitExceeded { .. } => "search_limit_exceeded",
            FlavorError::SearchTimedOut => "search_timeout",
        }
    }
}

/// Convenient Result type using FlavorError
pub type Result<T> = std::result::Result<T, FlavorError>;
