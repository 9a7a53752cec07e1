//! End-to-end tests over a real SQLite database.
//!
//! These tests drive the full library surface (submit, ingest, moderate,
//! search, delete) with a deterministic in-process embedding provider, and
//! additionally exercise the legacy stored-vector encodings at the SQLite
//! layer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

use corpus_gate::config::ChunkingConfig;
use corpus_gate::db;
use corpus_gate::embedding::EmbeddingProvider;
use corpus_gate::engine::{Engine, NewSource};
use corpus_gate::error::EngineError;
use corpus_gate::migrate;
use corpus_gate::models::{ModerationStatus, RelationKind, SourceKind};
use corpus_gate::store::sqlite::SqliteStore;
use corpus_gate::store::Store;

// ─── Test Provider ──────────────────────────────────────────────────

/// Deterministic bag-of-keywords embedder: each dimension counts the
/// occurrences of one seed term, so texts about the same topic land close
/// together under cosine similarity.
struct KeywordProvider;

const SEED_TERMS: [&str; 4] = ["rust", "python", "kubernetes", "cooking"];

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model_name(&self) -> &str {
        "keyword-bag"
    }

    fn dims(&self) -> usize {
        SEED_TERMS.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let lower = text.to_lowercase();
        Ok(SEED_TERMS
            .iter()
            .map(|term| lower.matches(term).count() as f32)
            .collect())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

async fn setup() -> (TempDir, SqlitePool, Engine) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("corpus.sqlite");

    let pool = db::connect(&db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let engine = Engine::new(
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(KeywordProvider),
        ChunkingConfig {
            target_size: 1000,
            overlap: 200,
        },
    );

    (tmp, pool, engine)
}

fn new_source(title: &str) -> NewSource {
    NewSource {
        title: title.to_string(),
        description: None,
        kind: SourceKind::Document,
        owner_id: "alice".to_string(),
        metadata: json!({}),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_migrations_idempotent() {
    let (_tmp, pool, _engine) = setup().await;
    migrate::run_migrations(&pool).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (_tmp, _pool, engine) = setup().await;

    let source = engine.create_source(new_source("Rust notes")).await.unwrap();
    assert_eq!(source.status, ModerationStatus::Pending);

    let count = engine
        .ingest(&source.id, "Notes about rust. More rust here.", &json!({}))
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Pending: invisible to search.
    let results = engine.search("all about rust", 5, 0.1).await.unwrap();
    assert!(results.is_empty());

    // Approve: visible, with citation back to the source.
    let approved = engine.approve(&source.id, "bob", true).await.unwrap();
    assert_eq!(approved.approved_by.as_deref(), Some("bob"));

    let results = engine.search("all about rust", 5, 0.1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source.id, source.id);
    assert_eq!(results[0].source.title, "Rust notes");
    assert!(results[0].similarity > 0.9);

    // Reject: invisible again.
    engine.reject(&source.id, true).await.unwrap();
    let results = engine.search("all about rust", 5, 0.1).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_multi_chunk_ingestion_metadata() {
    let (_tmp, pool, engine) = setup().await;

    let source = engine.create_source(new_source("Long doc")).await.unwrap();
    let sentence = "This is a sentence about rust programming and tooling. ";
    let text = sentence.repeat(50); // ~2750 chars
    let count = engine
        .ingest(&source.id, &text, &json!({"lang": "en"}))
        .await
        .unwrap();
    assert!(count >= 3);

    let store = SqliteStore::new(pool);
    let chunks = store.chunks_for_source(&source.id).await.unwrap();
    assert_eq!(chunks.len(), count);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i as i64);
        assert_eq!(c.metadata["chunk_index"], json!(i));
        assert_eq!(c.metadata["total_chunks"], json!(count));
        assert_eq!(c.metadata["lang"], json!("en"));
        assert!(c.embedding.is_some());
        assert!(!c.hash.is_empty());
    }
}

#[tokio::test]
async fn test_reingest_replaces_persisted_chunks() {
    let (_tmp, pool, engine) = setup().await;

    let source = engine.create_source(new_source("Revised doc")).await.unwrap();
    engine
        .ingest(&source.id, "original rust text", &json!({}))
        .await
        .unwrap();

    // Second ingest of the same source must replace, not collide on
    // (source_id, chunk_index).
    let count = engine
        .ingest(&source.id, "revised rust text", &json!({}))
        .await
        .unwrap();
    assert_eq!(count, 1);

    let store = SqliteStore::new(pool);
    let chunks = store.chunks_for_source(&source.id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "revised rust text");
}

#[tokio::test]
async fn test_search_ranks_by_relevance() {
    let (_tmp, _pool, engine) = setup().await;

    let rust_doc = engine.create_source(new_source("Rust doc")).await.unwrap();
    engine
        .ingest(&rust_doc.id, "rust rust rust ownership borrowing", &json!({}))
        .await
        .unwrap();
    engine.approve(&rust_doc.id, "bob", true).await.unwrap();

    let cooking_doc = engine.create_source(new_source("Cookbook")).await.unwrap();
    engine
        .ingest(&cooking_doc.id, "cooking cooking pasta recipes", &json!({}))
        .await
        .unwrap();
    engine.approve(&cooking_doc.id, "bob", true).await.unwrap();

    let results = engine.search("learning rust", 5, 0.1).await.unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].source.id, rust_doc.id);
    // The cooking chunk is orthogonal to the query and below threshold.
    assert!(results.iter().all(|r| r.source.id != cooking_doc.id));
}

#[tokio::test]
async fn test_legacy_vector_encodings_are_searchable() {
    let (_tmp, pool, engine) = setup().await;

    let source = engine.create_source(new_source("Legacy")).await.unwrap();
    engine.approve(&source.id, "bob", true).await.unwrap();

    // Rows as written by the original system: a JSON-text-encoded array
    // and an index-keyed object, inserted below the store's API.
    let now = Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO chunks (id, source_id, chunk_index, content, embedding_json, metadata_json, hash, created_at)
         VALUES (?, ?, ?, ?, ?, '{}', 'h', ?)",
    )
    .bind("legacy-string")
    .bind(&source.id)
    .bind(0i64)
    .bind("legacy string-encoded chunk")
    .bind(r#""[1.0, 0.0, 0.0, 0.0]""#)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO chunks (id, source_id, chunk_index, content, embedding_json, metadata_json, hash, created_at)
         VALUES (?, ?, ?, ?, ?, '{}', 'h', ?)",
    )
    .bind("legacy-object")
    .bind(&source.id)
    .bind(1i64)
    .bind("legacy object-encoded chunk")
    .bind(r#"{"0": 1.0, "1": 0.0, "2": 0.0, "3": 0.0}"#)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    // Both legacy rows normalize to the same vector and match a rust query.
    let results = engine.search("rust", 5, 0.5).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert!(ids.contains(&"legacy-string"));
    assert!(ids.contains(&"legacy-object"));
}

#[tokio::test]
async fn test_delete_cascades_no_orphans() {
    let (_tmp, pool, engine) = setup().await;

    let a = engine.create_source(new_source("a")).await.unwrap();
    let b = engine.create_source(new_source("b")).await.unwrap();
    engine
        .ingest(&a.id, "rust content for source a", &json!({}))
        .await
        .unwrap();
    engine
        .add_relation(&a.id, &b.id, RelationKind::References, 3)
        .await
        .unwrap();
    engine
        .add_relation(&b.id, &a.id, RelationKind::Supports, 8)
        .await
        .unwrap();

    engine.delete_source(&a.id).await.unwrap();

    let orphan_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE source_id = ?")
        .bind(&a.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphan_chunks, 0);

    let orphan_relations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM relations WHERE from_source = ? OR to_source = ?")
            .bind(&a.id)
            .bind(&a.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orphan_relations, 0);

    // Unrelated source survives.
    assert!(engine.get_source(&b.id).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_transition_guard() {
    let (_tmp, pool, engine) = setup().await;

    let source = engine.create_source(new_source("contested")).await.unwrap();
    let store = SqliteStore::new(pool);

    // First transition wins.
    store
        .update_source_status(
            &source.id,
            ModerationStatus::Pending,
            ModerationStatus::Approved,
            Some("bob"),
        )
        .await
        .unwrap();

    // A racer still holding the stale `pending` view loses cleanly.
    let err = store
        .update_source_status(
            &source.id,
            ModerationStatus::Pending,
            ModerationStatus::Rejected,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            from: ModerationStatus::Approved,
            ..
        }
    ));
}

#[tokio::test]
async fn test_connect_unusable_parent_is_io_error() {
    let tmp = TempDir::new().unwrap();
    // A regular file where the db directory should be.
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = db::connect(&blocker.join("corpus.sqlite")).await.unwrap_err();
    assert!(matches!(err, EngineError::Io(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_relations_roundtrip() {
    let (_tmp, pool, engine) = setup().await;

    let a = engine.create_source(new_source("a")).await.unwrap();
    let b = engine.create_source(new_source("b")).await.unwrap();
    engine
        .add_relation(&a.id, &b.id, RelationKind::Contradicts, 9)
        .await
        .unwrap();

    let store = SqliteStore::new(pool);
    let from_a = store.relations_for_source(&a.id).await.unwrap();
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a[0].kind, RelationKind::Contradicts);
    assert_eq!(from_a[0].strength, 9);

    // Visible from either endpoint.
    let from_b = store.relations_for_source(&b.id).await.unwrap();
    assert_eq!(from_b.len(), 1);
}
