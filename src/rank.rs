//! Vector similarity ranking.
//!
//! Scores candidate chunks against a query vector with cosine similarity,
//! applies a minimum-similarity cutoff, and returns the top results. This is
//! a full linear scan per query, correctness-first rather than scale-first. An ANN
//! index could be substituted behind [`rank`] without changing callers, as
//! long as the threshold and limit semantics stay exact.

use tracing::warn;

use crate::error::EngineError;
use crate::models::{Chunk, SimilarityResult, Source};

/// A chunk eligible for ranking, paired with its owning source.
///
/// Candidates without a vector are skipped entirely during ranking, not
/// scored as zero.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Chunk,
    pub source: Source,
    pub vector: Option<Vec<f32>>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// If either vector has zero norm the similarity is defined as `0.0`; the
/// division by zero is never performed.
///
/// # Errors
///
/// [`EngineError::DimensionMismatch`] when the vectors differ in length,
/// which indicates a provider/model change or data corruption.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EngineError> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    // Only a truly zero vector triggers the policy; tiny-magnitude vectors
    // still normalize correctly.
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rank candidates against a query vector.
///
/// 1. Scores every candidate that carries a vector; vectorless candidates
///    are skipped. A per-candidate dimension mismatch excludes that chunk
///    (logged) rather than failing the whole ranking.
/// 2. Discards scores strictly below `min_similarity`.
/// 3. Sorts descending by similarity; ties keep input order (the sort is
///    stable, so deterministic ordering falls out of deterministic input).
/// 4. Truncates to `limit` results.
pub fn rank(
    query: &[f32],
    candidates: Vec<Candidate>,
    limit: usize,
    min_similarity: f32,
) -> Vec<SimilarityResult> {
    let mut results: Vec<SimilarityResult> = Vec::new();

    for candidate in candidates {
        let Some(vector) = candidate.vector else {
            continue;
        };

        let similarity = match cosine_similarity(query, &vector) {
            Ok(s) => s,
            Err(e) => {
                warn!(chunk_id = %candidate.chunk.id, error = %e, "skipping chunk during ranking");
                continue;
            }
        };

        if similarity < min_similarity {
            continue;
        }

        results.push(SimilarityResult {
            chunk: candidate.chunk,
            source: candidate.source,
            similarity,
        });
    }

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);

    results
}
