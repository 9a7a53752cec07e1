//! Storage abstraction for the corpus engine.
//!
//! The [`Store`] trait defines all persistence operations the ingestion,
//! moderation, and retrieval orchestrators need, enabling pluggable
//! backends (SQLite, in-memory for tests).
//!
//! The store is the sole mutation point for durable state: no engine
//! component mutates shared in-memory state across requests. Concurrent
//! moderation transitions on the same source are serialized by
//! [`update_source_status`](Store::update_source_status)'s status guard.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{Chunk, ModerationStatus, Relation, Source};

/// Abstract storage backend for sources, chunks, and relations.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_source`](Store::create_source) | Persist a new source (status `pending`) |
/// | [`get_source`](Store::get_source) | Fetch a source by id |
/// | [`list_sources`](Store::list_sources) | List sources, optionally filtered by status |
/// | [`update_source_status`](Store::update_source_status) | Status-guarded moderation transition |
/// | [`delete_source`](Store::delete_source) | Cascading delete (chunks + relations) |
/// | [`insert_chunk`](Store::insert_chunk) | Persist one chunk |
/// | [`delete_chunks`](Store::delete_chunks) | Drop all chunks of a source (re-ingestion) |
/// | [`chunks_for_source`](Store::chunks_for_source) | All chunks of a source, in index order |
/// | [`create_relation`](Store::create_relation) | Persist a source-to-source edge |
/// | [`relations_for_source`](Store::relations_for_source) | Edges touching a source, either direction |
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new source row.
    async fn create_source(&self, source: &Source) -> Result<(), EngineError>;

    /// Fetch a source by id, or `None` if it does not exist.
    async fn get_source(&self, id: &str) -> Result<Option<Source>, EngineError>;

    /// List sources ordered by creation time then id, optionally filtered
    /// by moderation status. The ordering is what makes equal-similarity
    /// ranking ties deterministic.
    async fn list_sources(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Source>, EngineError>;

    /// Apply a moderation transition, guarded on the expected current
    /// status so two concurrent moderation calls cannot interleave.
    ///
    /// Records `approved_by`/`approved_at` when transitioning to
    /// `approved`. Returns the updated source.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the source does not exist.
    /// - [`EngineError::InvalidState`] if the source's status no longer
    ///   matches `from` (lost a concurrent race).
    async fn update_source_status(
        &self,
        id: &str,
        from: ModerationStatus,
        to: ModerationStatus,
        approver: Option<&str>,
    ) -> Result<Source, EngineError>;

    /// Delete a source together with all of its chunks and any relations
    /// where it is either endpoint.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the source does not exist.
    async fn delete_source(&self, id: &str) -> Result<(), EngineError>;

    /// Persist one chunk belonging to an existing source.
    async fn insert_chunk(&self, chunk: &Chunk) -> Result<(), EngineError>;

    /// Delete every chunk of a source. Re-ingestion replaces a source's
    /// chunks rather than accumulating duplicates.
    async fn delete_chunks(&self, source_id: &str) -> Result<(), EngineError>;

    /// All chunks of a source, ordered by `chunk_index`.
    async fn chunks_for_source(&self, source_id: &str) -> Result<Vec<Chunk>, EngineError>;

    /// Persist a directed relation between two sources.
    async fn create_relation(&self, relation: &Relation) -> Result<(), EngineError>;

    /// All relations where the source is either endpoint.
    async fn relations_for_source(&self, source_id: &str) -> Result<Vec<Relation>, EngineError>;
}
