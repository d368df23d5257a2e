//! In-memory embedding index and the process-wide cache that owns it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use crate::chunker::{load_policy_chunks, Chunk};
use crate::embedder::{l2_normalize, Embedder, EmbeddingVector};
use crate::error::{RagError, Result};

/// Chunks paired with their unit-length embeddings.
///
/// `embeddings[i]` always belongs to `chunks[i]` and every vector has the same
/// dimension.
#[derive(Debug, Clone, Default)]
pub struct Index {
    chunks: Vec<Chunk>,
    embeddings: Vec<EmbeddingVector>,
}

impl Index {
    /// Indexed chunks in corpus order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Normalized vectors, parallel to [`Index::chunks`].
    pub fn embeddings(&self) -> &[EmbeddingVector] {
        &self.embeddings
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when the corpus produced no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, or `None` for an empty index.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }
}

/// Embeds every chunk in one [`Embedder::embed`] call and normalizes the
/// results. An empty chunk list produces an empty index without calling the
/// embedder.
pub fn build_index<E>(embedder: &E, chunks: Vec<Chunk>) -> Result<Index>
where
    E: Embedder + ?Sized,
{
    if chunks.is_empty() {
        debug!("empty corpus, skipping embedding call");
        return Ok(Index::default());
    }
    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let mut embeddings = embedder.embed(&texts)?;
    if embeddings.len() != chunks.len() {
        return Err(RagError::malformed(
            "embeddings",
            format!("{} vectors for {} chunks", embeddings.len(), chunks.len()),
        ));
    }
    let dimension = embeddings[0].len();
    if dimension == 0 {
        return Err(RagError::malformed("embeddings", "zero-length vector"));
    }
    for vector in embeddings.iter_mut() {
        if vector.len() != dimension {
            return Err(RagError::malformed(
                "embeddings",
                format!("mixed dimensions {} and {}", dimension, vector.len()),
            ));
        }
        l2_normalize(vector);
    }
    info!(chunks = chunks.len(), dimension, "built embedding index");
    Ok(Index { chunks, embeddings })
}

/// Lazily built indexes keyed by corpus path.
///
/// Concurrent first requests for the same path build the index once; the
/// other callers block until it is ready. A failed build is not cached.
#[derive(Default)]
pub struct IndexCache {
    entries: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<Index>>>>>,
}

impl IndexCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached index for `path`, loading and embedding the corpus
    /// on first use.
    pub fn get_or_build<E>(&self, path: impl AsRef<Path>, embedder: &E) -> Result<Arc<Index>>
    where
        E: Embedder + ?Sized,
    {
        let path = path.as_ref();
        let cell = self.cell(path);
        if let Some(index) = cell.get() {
            debug!(path = %path.display(), "index cache hit");
            return Ok(Arc::clone(index));
        }
        cell.get_or_try_init(|| -> Result<Arc<Index>> {
            info!(path = %path.display(), "building index");
            let chunks = load_policy_chunks(path)?;
            build_index(embedder, chunks).map(Arc::new)
        })
        .cloned()
    }

    /// Returns the index for `path` if it has already been built.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Index>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(path.as_ref()).and_then(|cell| cell.get().cloned())
    }

    /// Number of corpora with a built index.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.get().is_some()).count()
    }

    /// True when no index has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, path: &Path) -> Arc<OnceCell<Arc<Index>>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(path.to_path_buf()).or_default())
    }
}

static GLOBAL_CACHE: Lazy<IndexCache> = Lazy::new(IndexCache::new);

/// Process-wide cache, alive until the process exits.
pub fn global_cache() -> &'static IndexCache {
    &GLOBAL_CACHE
}
