//! In-memory [`Store`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Semantics match the SQLite backend, including the status-guarded
//! transition and cascading delete.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::EngineError;
use crate::models::{Chunk, ModerationStatus, Relation, Source};

use super::Store;

/// In-memory store for unit tests of the orchestrators and engine.
#[derive(Default)]
pub struct InMemoryStore {
    sources: RwLock<HashMap<String, Source>>,
    chunks: RwLock<Vec<Chunk>>,
    relations: RwLock<Vec<Relation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_source(&self, source: &Source) -> Result<(), EngineError> {
        let mut sources = self.sources.write().unwrap();
        sources.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>, EngineError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.get(id).cloned())
    }

    async fn list_sources(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Source>, EngineError> {
        let sources = self.sources.read().unwrap();
        let mut listed: Vec<Source> = sources
            .values()
            .filter(|s| status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn update_source_status(
        &self,
        id: &str,
        from: ModerationStatus,
        to: ModerationStatus,
        approver: Option<&str>,
    ) -> Result<Source, EngineError> {
        let mut sources = self.sources.write().unwrap();
        let source = sources
            .get_mut(id)
            .ok_or_else(|| EngineError::source_not_found(id))?;

        if source.status != from {
            return Err(EngineError::InvalidState {
                from: source.status,
                to,
            });
        }

        let now = Utc::now();
        source.status = to;
        source.updated_at = now;
        if to == ModerationStatus::Approved {
            source.approved_by = approver.map(str::to_string);
            source.approved_at = Some(now);
        }

        Ok(source.clone())
    }

    async fn delete_source(&self, id: &str) -> Result<(), EngineError> {
        let removed = self.sources.write().unwrap().remove(id);
        if removed.is_none() {
            return Err(EngineError::source_not_found(id));
        }

        self.chunks.write().unwrap().retain(|c| c.source_id != id);
        self.relations
            .write()
            .unwrap()
            .retain(|r| r.from_source != id && r.to_source != id);

        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<(), EngineError> {
        self.chunks.write().unwrap().push(chunk.clone());
        Ok(())
    }

    async fn delete_chunks(&self, source_id: &str) -> Result<(), EngineError> {
        self.chunks
            .write()
            .unwrap()
            .retain(|c| c.source_id != source_id);
        Ok(())
    }

    async fn chunks_for_source(&self, source_id: &str) -> Result<Vec<Chunk>, EngineError> {
        let chunks = self.chunks.read().unwrap();
        let mut owned: Vec<Chunk> = chunks
            .iter()
            .filter(|c| c.source_id == source_id)
            .cloned()
            .collect();
        owned.sort_by_key(|c| c.chunk_index);
        Ok(owned)
    }

    async fn create_relation(&self, relation: &Relation) -> Result<(), EngineError> {
        self.relations.write().unwrap().push(relation.clone());
        Ok(())
    }

    async fn relations_for_source(&self, source_id: &str) -> Result<Vec<Relation>, EngineError> {
        let relations = self.relations.read().unwrap();
        Ok(relations
            .iter()
            .filter(|r| r.from_source == source_id || r.to_source == source_id)
            .cloned()
            .collect())
    }
}
