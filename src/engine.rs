//! The engine facade: the library's external interface.
//!
//! [`Engine`] ties the chunker, embedding provider, moderation gate, and
//! persistence layer together behind the operations the surrounding
//! application calls: submit, ingest, approve, reject, search, delete.
//!
//! The engine performs no authentication. Callers pass the result of their
//! own authorization decision into [`approve`](Engine::approve) and
//! [`reject`](Engine::reject); a negative decision fails with
//! [`EngineError::Unauthorized`] before any state is touched.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::ingest::ingest_source;
use crate::models::{
    ModerationStatus, Relation, RelationKind, SimilarityResult, Source, SourceKind,
};
use crate::moderation::check_transition;
use crate::search::search_corpus;
use crate::store::Store;

/// Parameters for submitting a new source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub title: String,
    pub description: Option<String>,
    pub kind: SourceKind,
    pub owner_id: String,
    pub metadata: serde_json::Value,
}

/// The knowledge ingestion and retrieval engine.
///
/// Holds its collaborators behind `Arc` so one engine can serve many
/// concurrent request-scoped operations; the engine itself keeps no mutable
/// state between calls.
pub struct Engine {
    store: Arc<dyn Store>,
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            provider,
            chunking,
        }
    }

    /// Create a new source in `pending` status.
    pub async fn create_source(&self, new: NewSource) -> Result<Source, EngineError> {
        let now = Utc::now();
        let source = Source {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            kind: new.kind,
            status: ModerationStatus::Pending,
            owner_id: new.owner_id,
            approved_by: None,
            approved_at: None,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        self.store.create_source(&source).await?;
        info!(source_id = %source.id, title = %source.title, "source submitted");
        Ok(source)
    }

    /// Chunk, embed, and persist `raw_text` under `source_id`.
    ///
    /// Returns the number of chunks persisted. Does not change the source's
    /// moderation status.
    pub async fn ingest(
        &self,
        source_id: &str,
        raw_text: &str,
        metadata: &serde_json::Value,
    ) -> Result<usize, EngineError> {
        let count = ingest_source(
            self.store.as_ref(),
            self.provider.as_ref(),
            &self.chunking,
            source_id,
            raw_text,
            metadata,
        )
        .await?;
        info!(source_id = %source_id, chunks = count, "ingestion complete");
        Ok(count)
    }

    /// Approve a source, making its chunks retrievable.
    ///
    /// `authorized` is the caller's authorization decision; the engine does
    /// not authenticate.
    pub async fn approve(
        &self,
        source_id: &str,
        approver_id: &str,
        authorized: bool,
    ) -> Result<Source, EngineError> {
        if !authorized {
            return Err(EngineError::Unauthorized(source_id.to_string()));
        }

        let source = self
            .store
            .get_source(source_id)
            .await?
            .ok_or_else(|| EngineError::source_not_found(source_id))?;

        check_transition(source.status, ModerationStatus::Approved)?;

        let updated = self
            .store
            .update_source_status(
                source_id,
                source.status,
                ModerationStatus::Approved,
                Some(approver_id),
            )
            .await?;
        info!(source_id = %source_id, approver = %approver_id, "source approved");
        Ok(updated)
    }

    /// Reject a source, excluding its chunks from retrieval.
    pub async fn reject(&self, source_id: &str, authorized: bool) -> Result<Source, EngineError> {
        if !authorized {
            return Err(EngineError::Unauthorized(source_id.to_string()));
        }

        let source = self
            .store
            .get_source(source_id)
            .await?
            .ok_or_else(|| EngineError::source_not_found(source_id))?;

        check_transition(source.status, ModerationStatus::Rejected)?;

        let updated = self
            .store
            .update_source_status(source_id, source.status, ModerationStatus::Rejected, None)
            .await?;
        info!(source_id = %source_id, "source rejected");
        Ok(updated)
    }

    /// Rank the approved corpus against `query_text`.
    pub async fn search(
        &self,
        query_text: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityResult>, EngineError> {
        search_corpus(
            self.store.as_ref(),
            self.provider.as_ref(),
            query_text,
            limit,
            min_similarity,
        )
        .await
    }

    /// Delete a source and cascade to its chunks and relations.
    pub async fn delete_source(&self, source_id: &str) -> Result<(), EngineError> {
        self.store.delete_source(source_id).await?;
        info!(source_id = %source_id, "source deleted");
        Ok(())
    }

    /// Record a directed, strength-weighted relation between two sources.
    pub async fn add_relation(
        &self,
        from_source: &str,
        to_source: &str,
        kind: RelationKind,
        strength: u8,
    ) -> Result<Relation, EngineError> {
        if !(1..=10).contains(&strength) {
            return Err(EngineError::InvalidInput(format!(
                "relation strength must be in 1..=10, got {}",
                strength
            )));
        }

        for id in [from_source, to_source] {
            if self.store.get_source(id).await?.is_none() {
                return Err(EngineError::source_not_found(id));
            }
        }

        let relation = Relation {
            id: Uuid::new_v4().to_string(),
            from_source: from_source.to_string(),
            to_source: to_source.to_string(),
            kind,
            strength,
            created_at: Utc::now(),
        };
        self.store.create_relation(&relation).await?;
        Ok(relation)
    }

    /// Fetch a source by id.
    pub async fn get_source(&self, source_id: &str) -> Result<Source, EngineError> {
        self.store
            .get_source(source_id)
            .await?
            .ok_or_else(|| EngineError::source_not_found(source_id))
    }

    /// List sources, optionally filtered by moderation status.
    pub async fn list_sources(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Source>, EngineError> {
        self.store.list_sources(status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::store::memory::InMemoryStore;

    struct UnitProvider;

    #[async_trait]
    impl EmbeddingProvider for UnitProvider {
        fn model_name(&self) -> &str {
            "unit"
        }

        fn dims(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EngineError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn engine() -> Engine {
        Engine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(UnitProvider),
            ChunkingConfig {
                target_size: 1000,
                overlap: 200,
            },
        )
    }

    fn new_source(title: &str) -> NewSource {
        NewSource {
            title: title.to_string(),
            description: None,
            kind: SourceKind::Document,
            owner_id: "owner-1".to_string(),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn test_created_source_is_pending() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();
        assert_eq!(source.status, ModerationStatus::Pending);
        assert!(source.approved_by.is_none());
    }

    #[tokio::test]
    async fn test_pending_source_not_searchable_until_approved() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();
        engine
            .ingest(&source.id, "some searchable text", &json!({}))
            .await
            .unwrap();

        let results = engine.search("query", 5, -1.0).await.unwrap();
        assert!(results.is_empty());

        engine.approve(&source.id, "mod-1", true).await.unwrap();

        let results = engine.search("query", 5, -1.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.id, source.id);
    }

    #[tokio::test]
    async fn test_approve_records_approver() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();
        let approved = engine.approve(&source.id, "mod-1", true).await.unwrap();
        assert_eq!(approved.status, ModerationStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("mod-1"));
        assert!(approved.approved_at.is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_moderation_rejected() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();
        let err = engine.approve(&source.id, "mod-1", false).await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        // State untouched.
        let current = engine.get_source(&source.id).await.unwrap();
        assert_eq!(current.status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn test_remoderation_cycle() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();

        engine.approve(&source.id, "mod-1", true).await.unwrap();
        let rejected = engine.reject(&source.id, true).await.unwrap();
        assert_eq!(rejected.status, ModerationStatus::Rejected);

        let reapproved = engine.approve(&source.id, "mod-2", true).await.unwrap();
        assert_eq!(reapproved.status, ModerationStatus::Approved);
        assert_eq!(reapproved.approved_by.as_deref(), Some("mod-2"));
    }

    #[tokio::test]
    async fn test_double_approve_invalid_state() {
        let engine = engine();
        let source = engine.create_source(new_source("doc")).await.unwrap();
        engine.approve(&source.id, "mod-1", true).await.unwrap();
        let err = engine.approve(&source.id, "mod-2", true).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_moderating_missing_source() {
        let engine = engine();
        let err = engine.approve("ghost", "mod-1", true).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let engine = engine();
        let a = engine.create_source(new_source("a")).await.unwrap();
        let b = engine.create_source(new_source("b")).await.unwrap();
        engine.ingest(&a.id, "text for a", &json!({})).await.unwrap();
        engine
            .add_relation(&a.id, &b.id, RelationKind::Supports, 7)
            .await
            .unwrap();

        engine.delete_source(&a.id).await.unwrap();

        assert!(matches!(
            engine.get_source(&a.id).await.unwrap_err(),
            EngineError::NotFound { .. }
        ));
        // No orphaned chunks: an approved search over b finds nothing of a.
        engine.approve(&b.id, "mod-1", true).await.unwrap();
        let results = engine.search("query", 10, -1.0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_relation_strength_bounds() {
        let engine = engine();
        let a = engine.create_source(new_source("a")).await.unwrap();
        let b = engine.create_source(new_source("b")).await.unwrap();

        let err = engine
            .add_relation(&a.id, &b.id, RelationKind::Related, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let err = engine
            .add_relation(&a.id, &b.id, RelationKind::Related, 11)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let relation = engine
            .add_relation(&a.id, &b.id, RelationKind::Contradicts, 10)
            .await
            .unwrap();
        assert_eq!(relation.strength, 10);
    }

    #[tokio::test]
    async fn test_delete_missing_source() {
        let engine = engine();
        let err = engine.delete_source("ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
