#![warn(missing_docs)]
//! Retrieval core for the policy and HR question-answering assistant.
//!
//! A corpus is split into paragraph [`Chunk`]s, embedded once into an
//! [`Index`], and queried by brute-force cosine similarity. The top passages
//! become grounding context for a chat-completion call.

pub mod chunker;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod embedder;
pub mod error;
pub mod index;
pub mod llm;
pub mod logging;
pub mod retriever;

pub use chunker::{load_policy_chunks, split_paragraphs, Chunk};
pub use composer::{Answer, AnswerComposer, CONTEXT_SEPARATOR, DEFAULT_TEMPERATURE, SYSTEM_PROMPT};
pub use config::AssistantArgs;
pub use conversation::{Conversation, Message, Role};
pub use embedder::{Embedder, EmbeddingVector, OpenAiEmbedder};
pub use error::{RagError, Result};
pub use index::{build_index, global_cache, Index, IndexCache};
pub use llm::{ChatProvider, ChatRequest, OpenAiChat};
pub use retriever::{retrieve_similar, RetrievalResult, DEFAULT_TOP_K};
