//! Error type shared by the aggregator and the database layer.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    /// A referenced OKR or key result does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Parent key result outside the owning OKR.
    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    /// Parent links loop back on themselves.
    #[error("Cycle detected in key result tree at {0}")]
    CycleDetected(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Could not resolve a data directory for the database")]
    NoDataDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn okr_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "OKR", id }
    }

    pub fn key_result_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Key result",
            id,
        }
    }
}
