//! Ingestion pipeline orchestration.
//!
//! Coordinates chunking, embedding, and persistence for a newly submitted
//! source. Chunks are processed in order so the persisted `chunk_index`
//! metadata is meaningful. A failed embedding for one chunk never aborts
//! the rest: the chunk is stored without a vector, logged, and left for a
//! later re-embedding pass (its content hash makes staleness detectable).

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::models::Chunk;
use crate::store::Store;

/// Chunk, embed, and persist `raw_text` under an existing source.
///
/// Each persisted chunk's metadata is the caller's `metadata` map extended
/// with `chunk_index` (0-based) and `total_chunks`. Returns the number of
/// chunks persisted. Ingesting into a source that already has chunks
/// replaces them.
///
/// # Errors
///
/// - [`EngineError::NotFound`] if the source does not exist.
/// - [`EngineError::Storage`] if persisting any chunk fails. Persistence
///   failures are always fatal, unlike per-chunk embedding failures.
pub async fn ingest_source(
    store: &dyn Store,
    provider: &dyn EmbeddingProvider,
    chunking: &ChunkingConfig,
    source_id: &str,
    raw_text: &str,
    metadata: &serde_json::Value,
) -> Result<usize, EngineError> {
    if store.get_source(source_id).await?.is_none() {
        return Err(EngineError::source_not_found(source_id));
    }

    store.delete_chunks(source_id).await?;

    let pieces = chunk_text(raw_text, chunking.target_size, chunking.overlap);
    let total = pieces.len();

    let base_metadata = metadata.as_object().cloned().unwrap_or_default();

    for (index, content) in pieces.into_iter().enumerate() {
        // Embedding failure is chunk-scoped: store without a vector and
        // keep going.
        let embedding = match provider.embed(&content).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(
                    source_id = %source_id,
                    chunk_index = index,
                    error = %e,
                    "embedding failed, storing chunk without vector"
                );
                None
            }
        };

        let mut chunk_metadata = base_metadata.clone();
        chunk_metadata.insert("chunk_index".to_string(), serde_json::json!(index));
        chunk_metadata.insert("total_chunks".to_string(), serde_json::json!(total));

        let chunk = Chunk {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            chunk_index: index as i64,
            hash: hash_text(&content),
            content,
            embedding,
            metadata: serde_json::Value::Object(chunk_metadata),
            created_at: Utc::now(),
        };

        store.insert_chunk(&chunk).await?;
    }

    Ok(total)
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
