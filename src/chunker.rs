//! Paragraph chunking for plain-text policy corpora.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};

/// One retrievable paragraph of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position of the paragraph in the source corpus.
    pub id: usize,
    /// Paragraph text with surrounding whitespace removed.
    pub text: String,
}

/// Reads a UTF-8 corpus file and splits it into paragraph chunks.
pub fn load_policy_chunks(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| RagError::CorpusRead {
        path: path.to_path_buf(),
        source,
    })?;
    let chunks = split_paragraphs(&text);
    debug!(path = %path.display(), chunks = chunks.len(), "loaded policy corpus");
    Ok(chunks)
}

/// Splits text on blank lines (`\n\n`), trimming each segment and dropping
/// the ones that end up empty. Ids follow the order of the surviving segments.
pub fn split_paragraphs(text: &str) -> Vec<Chunk> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(id, segment)| Chunk {
            id,
            text: segment.to_string(),
        })
        .collect()
}
