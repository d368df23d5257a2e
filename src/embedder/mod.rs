//! Embedding clients and the vector helpers the index relies on.

pub mod openai;

use crate::error::Result;

pub use openai::OpenAiEmbedder;

/// Dense vector produced for one input string.
pub type EmbeddingVector = Vec<f32>;

/// Anything that can turn text into embedding vectors.
///
/// Implementations must return exactly one vector per input, in input order.
/// How inputs are grouped into requests is up to the implementation.
pub trait Embedder: Send + Sync {
    /// Embeds every string in `texts`.
    fn embed(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>>;
}

/// Euclidean length of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `vector` to unit length in place.
///
/// A zero (or non-finite) norm leaves the vector untouched, so a zero vector
/// stays zero and scores 0.0 against everything.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm == 0.0 || !norm.is_finite() {
        return;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
