//! Exact top-k ranking over a loaded tenant index.
//!
//! A linear scan computes cosine similarity against every stored vector,
//! which is exact and adequate for per-tenant corpora of hundreds to low
//! thousands of chunks. There is no approximate index.
//!
//! # Ordering
//!
//! Results are sorted by score descending. Equal scores keep ingestion
//! order (the earlier chunk wins), so identical inputs always produce
//! identical output.

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{SearchHit, TenantIndex};

/// Return the `k` chunks most similar to `query`.
///
/// The result length is exactly `min(k, index.len())`. An empty index
/// yields an empty result regardless of the query.
///
/// # Errors
///
/// [`RetrievalError::DimensionMismatch`] when `query` and the stored
/// vectors differ in length.
pub fn rank_top_k(index: &TenantIndex, query: &[f32], k: usize) -> RetrievalResult<Vec<SearchHit>> {
    let Some(dims) = index.dims() else {
        return Ok(Vec::new());
    };
    if query.len() != dims {
        return Err(RetrievalError::DimensionMismatch {
            expected: dims,
            actual: query.len(),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut scored: Vec<(usize, f32)> = index
        .embeddings
        .iter()
        .enumerate()
        .map(|(ordinal, emb)| (ordinal, cosine_similarity(query, &emb.vector)))
        .collect();

    scored.sort_by(|a, b| by_score_then_ordinal(*a, *b));
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .map(|(ordinal, score)| SearchHit {
            score,
            chunk: index.chunks[ordinal].clone(),
        })
        .collect())
}

fn by_score_then_ordinal(a: (usize, f32), b: (usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}
