//! Retrieval pipeline orchestration.
//!
//! Coordinates corpus filtering, query embedding, and ranking for a search.
//! Only `approved` sources contribute candidates; `pending` and `rejected`
//! sources are excluded before any scoring happens. Search never writes, so
//! a cancelled search leaves no persisted side effects.

use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::models::{ModerationStatus, SimilarityResult};
use crate::rank::{rank, Candidate};
use crate::store::Store;

/// Rank the approved corpus against `query_text`.
///
/// 1. Lists approved sources; returns empty immediately when there are
///    none, without calling the embedding provider.
/// 2. Embeds the query. Failure here fails the whole search, there is no
///    partial result to fall back to.
/// 3. Collects every chunk of every approved source (sources in creation
///    order, chunks in index order, which is the deterministic tie-break
///    order).
/// 4. Ranks with the caller's `limit` and `min_similarity`.
///
/// Each result carries its owning [`Source`](crate::models::Source) so the
/// caller can render citations.
///
/// # Errors
///
/// [`EngineError::EmbeddingUnavailable`] if the query cannot be embedded;
/// [`EngineError::Storage`] on persistence failures.
pub async fn search_corpus(
    store: &dyn Store,
    provider: &dyn EmbeddingProvider,
    query_text: &str,
    limit: usize,
    min_similarity: f32,
) -> Result<Vec<SimilarityResult>, EngineError> {
    let approved = store
        .list_sources(Some(ModerationStatus::Approved))
        .await?;

    if approved.is_empty() {
        debug!("no approved sources, skipping query embedding");
        return Ok(Vec::new());
    }

    let query_vector = provider.embed(query_text).await?;

    let mut candidates: Vec<Candidate> = Vec::new();
    for source in approved {
        let chunks = store.chunks_for_source(&source.id).await?;
        for chunk in chunks {
            let vector = chunk.embedding.clone();
            candidates.push(Candidate {
                chunk,
                source: source.clone(),
                vector,
            });
        }
    }

    debug!(
        candidates = candidates.len(),
        limit, min_similarity, "ranking corpus"
    );

    Ok(rank(&query_vector, candidates, limit, min_similarity))
}
