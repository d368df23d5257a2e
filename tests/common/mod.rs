#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use policybot::{ChatProvider, ChatRequest, Embedder, EmbeddingVector, Message, RagError};

/// Counts vocabulary words; each vocabulary entry is one dimension.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn policy() -> Self {
        Self::new(&[
            "leave", "days", "annual", "employees", "fees", "due", "month", "sick", "uniform",
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
        {
            if let Some(pos) = self.vocabulary.iter().position(|v| *v == word) {
                vector[pos] += 1.0;
            }
        }
        vector
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[&str]) -> policybot::Result<Vec<EmbeddingVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

/// Replies with a fixed string and remembers every request.
pub struct CannedChat {
    reply: String,
    requests: Mutex<Vec<(Vec<Message>, f32)>>,
}

impl CannedChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(Vec<Message>, f32)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ChatProvider for CannedChat {
    fn complete(&self, request: &ChatRequest<'_>) -> policybot::Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((request.messages.to_vec(), request.temperature));
        Ok(self.reply.clone())
    }
}

/// Always fails like an unreachable completion service.
pub struct DownChat;

impl ChatProvider for DownChat {
    fn complete(&self, _request: &ChatRequest<'_>) -> policybot::Result<String> {
        Err(RagError::Upstream {
            service: "chat",
            message: "503 Service Unavailable".into(),
        })
    }
}

pub const POLICY_CORPUS: &str = "Employees accrue 20 days annual leave.\n\nFees are due on the 1st of each month.\n";
