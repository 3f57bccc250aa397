use thiserror::Error;

use crate::family::{PersonId, RelationType};

/// Main error type for Kinship
#[derive(Error, Debug)]
pub enum KinshipError {
    /// Referenced person or relation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Relation references a person that is not in the store
    #[error("Invalid endpoint: relation {from} -> {to} references an unknown person")]
    InvalidEndpoint { from: PersonId, to: PersonId },

    /// Identical (from, to, type) relation already stored
    #[error("Duplicate relation: {from} -> {to} ({relation_type})")]
    DuplicateRelation {
        from: PersonId,
        to: PersonId,
        relation_type: RelationType,
    },

    /// Relation from a person to themselves
    #[error("Self relation on person {0}")]
    SelfRelation(PersonId),

    /// A third parent for the same child
    #[error("Person {0} already has two parents")]
    TooManyParents(PersonId),

    /// Unrecognized algorithm selector
    #[error("Invalid algorithm: {0} (expected dfs, bfs or dijkstra)")]
    InvalidAlgorithm(String),

    /// Query references a person absent from the graph
    #[error("Unknown person: {0}")]
    UnknownPerson(PersonId),

    /// Malformed input (missing name, bad id, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KinshipError {
    /// Stable machine-readable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            KinshipError::NotFound(_) => "not_found",
            KinshipError::InvalidEndpoint { .. } => "invalid_endpoint",
            KinshipError::DuplicateRelation { .. } => "duplicate_relation",
            KinshipError::SelfRelation(_) => "self_relation",
            KinshipError::TooManyParents(_) => "too_many_parents",
            KinshipError::InvalidAlgorithm(_) => "invalid_algorithm",
            KinshipError::UnknownPerson(_) => "unknown_person",
            KinshipError::InvalidInput(_) => "invalid_input",
            KinshipError::Database(_) => "database",
            KinshipError::Io(_) => "io",
            KinshipError::Json(_) => "json",
            KinshipError::Config(_) => "config",
        }
    }
}

/// Convenient Result type using KinshipError
pub type Result<T> = std::result::Result<T, KinshipError>;
