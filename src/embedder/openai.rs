//! OpenAI-based embedding client implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbeddingVector};
use crate::error::{RagError, Result};

const SERVICE: &str = "embeddings";

/// Blocking embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    batch_size: Option<usize>,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    ///
    /// `batch_size` caps the number of inputs per request; `None` sends every
    /// input of an [`Embedder::embed`] call in a single request.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        dimensions: Option<usize>,
        timeout: Duration,
        batch_size: Option<usize>,
    ) -> Result<Self> {
        let model = model.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("missing OpenAI API key".into()));
        }
        if model.trim().is_empty() {
            return Err(RagError::Config("missing embedding model name".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| RagError::Config(format!("failed to build HTTP client: {err}")))?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
            batch_size: batch_size.filter(|size| *size > 0),
        })
    }

    /// Embedding model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Maximum batch size configured for this client, if any.
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<EmbeddingVector>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|err| RagError::upstream(SERVICE, err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::upstream(SERVICE, format!("{status}: {body}")));
        }
        let mut parsed: EmbeddingResponse = resp
            .json()
            .map_err(|err| RagError::malformed(SERVICE, err.to_string()))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(RagError::malformed(
                SERVICE,
                format!(
                    "{} embeddings for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            ));
        }
        Ok(parsed
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch_size = self.batch_size.unwrap_or(texts.len());
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            debug!(model = %self.model, inputs = batch.len(), "requesting embeddings");
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
