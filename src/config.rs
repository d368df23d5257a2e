//! Command-line and environment settings shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::composer::{AnswerComposer, DEFAULT_TEMPERATURE};
use crate::embedder::OpenAiEmbedder;
use crate::error::{RagError, Result};
use crate::llm::OpenAiChat;
use crate::retriever::DEFAULT_TOP_K;

/// Default location of the policy corpus.
pub const DEFAULT_CORPUS: &str = "Data/policies.txt";

/// Corpus, model and retrieval settings.
#[derive(Args, Debug, Clone)]
pub struct AssistantArgs {
    /// Plain-text policy corpus, paragraphs separated by blank lines
    #[arg(long, env = "POLICYBOT_CORPUS", default_value = DEFAULT_CORPUS)]
    pub corpus: PathBuf,

    /// OpenAI API key used for embeddings and completions
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for the OpenAI-compatible API
    #[arg(
        long,
        env = "POLICYBOT_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Embedding model identifier
    #[arg(
        long,
        env = "POLICYBOT_EMBED_MODEL",
        default_value = "text-embedding-3-small"
    )]
    pub embed_model: String,

    /// Optional embedding dimension override when supported by the model
    #[arg(long, env = "POLICYBOT_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Max inputs per embedding request (unset or 0 = whole corpus in one request)
    #[arg(long, env = "POLICYBOT_EMBED_BATCH")]
    pub embed_batch: Option<usize>,

    /// Chat model used to compose answers
    #[arg(long, env = "POLICYBOT_CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    /// Number of passages retrieved per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Sampling temperature for the answer model
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Seconds before an upstream request times out
    #[arg(long, env = "POLICYBOT_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,
}

impl AssistantArgs {
    /// Request timeout applied to both clients.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY must be set".into()))
    }

    /// Builds the embedding client.
    pub fn build_embedder(&self) -> Result<OpenAiEmbedder> {
        OpenAiEmbedder::new(
            self.api_key()?,
            &self.openai_base_url,
            self.embed_model.clone(),
            self.embed_dimensions,
            self.timeout(),
            self.embed_batch,
        )
    }

    /// Builds the completion client.
    pub fn build_chat(&self) -> Result<OpenAiChat> {
        OpenAiChat::new(
            self.api_key()?,
            &self.openai_base_url,
            self.chat_model.clone(),
            self.timeout(),
        )
    }

    /// Wires both clients into an [`AnswerComposer`].
    pub fn build_composer(&self) -> Result<AnswerComposer> {
        let embedder = Arc::new(self.build_embedder()?);
        let chat = Arc::new(self.build_chat()?);
        Ok(AnswerComposer::new(embedder, chat)
            .with_top_k(self.top_k)
            .with_temperature(self.temperature))
    }
}
