//! Brute-force cosine retrieval over an [`Index`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedder::{dot, l2_normalize, Embedder};
use crate::error::{RagError, Result};
use crate::index::Index;

/// Number of passages retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// A chunk's text paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Id of the matching chunk.
    pub chunk_id: usize,
    /// Copy of the chunk text.
    pub text: String,
    /// Cosine similarity between query and chunk.
    pub score: f32,
}

/// Returns up to `k` chunks ranked by cosine similarity to `query`, highest
/// first. Equal scores keep corpus order.
///
/// `k == 0` and an empty index return nothing, whatever the query, without
/// calling the embedder. Otherwise a blank query is rejected with
/// [`RagError::EmptyQuery`].
pub fn retrieve_similar<E>(
    embedder: &E,
    index: &Index,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievalResult>>
where
    E: Embedder + ?Sized,
{
    if k == 0 || index.is_empty() {
        return Ok(Vec::new());
    }
    if query.trim().is_empty() {
        return Err(RagError::EmptyQuery);
    }

    let mut query_vector = embedder
        .embed(&[query])?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::malformed("embeddings", "no vector for query"))?;
    let expected = index.dimension().unwrap_or_default();
    if query_vector.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            got: query_vector.len(),
        });
    }
    l2_normalize(&mut query_vector);

    let mut scored: Vec<(usize, f32)> = index
        .embeddings()
        .iter()
        .map(|vector| dot(vector, &query_vector))
        .enumerate()
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    debug!(candidates = index.len(), returned = scored.len(), "ranked chunks");

    let chunks = index.chunks();
    Ok(scored
        .into_iter()
        .map(|(idx, score)| RetrievalResult {
            chunk_id: chunks[idx].id,
            text: chunks[idx].text.clone(),
            score,
        })
        .collect())
}
