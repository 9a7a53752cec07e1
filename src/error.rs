//! Error taxonomy for the corpus engine.
//!
//! Every fallible engine operation returns [`EngineError`]. The variants map
//! directly onto the failure modes callers are expected to branch on:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`EmbeddingUnavailable`](EngineError::EmbeddingUnavailable) | Provider call failed (network, quota, misconfiguration). Fatal for search, tolerated per-chunk for ingestion. |
//! | [`DimensionMismatch`](EngineError::DimensionMismatch) | Two vectors of different lengths were compared. Excludes the chunk, never the whole search. |
//! | [`NotFound`](EngineError::NotFound) | Referenced source or chunk does not exist. |
//! | [`Unauthorized`](EngineError::Unauthorized) | Moderation action attempted without an affirmative authorization decision. |
//! | [`InvalidState`](EngineError::InvalidState) | A moderation transition the state machine does not permit. |

use crate::models::ModerationStatus;

/// Errors surfaced by the engine's public operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The embedding provider could not produce a vector.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Two vectors of different dimensionality were compared.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The caller's authorization decision was negative.
    #[error("not authorized to moderate source {0}")]
    Unauthorized(String),

    /// The requested moderation transition is not legal.
    #[error("illegal moderation transition: {from} -> {to}")]
    InvalidState {
        from: ModerationStatus,
        to: ModerationStatus,
    },

    /// Invalid input to the engine (e.g. a zero chunk size).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence layer failure. Always fatal for the operation in progress.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Filesystem failure around the database (e.g. creating its directory).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata or vector (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for a [`EngineError::NotFound`] on a source id.
    pub fn source_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "source",
            id: id.to_string(),
        }
    }
}
