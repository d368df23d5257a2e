//! Grounding-prompt assembly and the retrieve-then-complete flow.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::conversation::{Conversation, Message, Role};
use crate::embedder::Embedder;
use crate::error::Result;
use crate::index::Index;
use crate::llm::{ChatProvider, ChatRequest};
use crate::retriever::{retrieve_similar, RetrievalResult, DEFAULT_TOP_K};

/// Placed between retrieved passages in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Sampling temperature used for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Instruction sent as the system message of every completion.
pub const SYSTEM_PROMPT: &str = "You are an internal assistant for a group of schools in the UAE.
Answer questions about school and HR policies using ONLY the provided context.
If the answer is not in the context, say you don't know and ask the user to check with HR or Administration.
Be concise and clear.";

/// Joins passage texts with [`CONTEXT_SEPARATOR`].
pub fn render_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|result| result.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Lays out the user turn: retrieved context first, then the question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Context from policy documents:\n{context}\n\nQuestion:\n{question}")
        .trim()
        .to_string()
}

/// System instruction followed by the grounded user turn.
pub fn build_messages(question: &str, results: &[RetrievalResult]) -> Vec<Message> {
    let context = render_context(results);
    vec![
        Message::new(Role::System, SYSTEM_PROMPT),
        Message::new(Role::User, build_user_prompt(&context, question)),
    ]
}

/// Model reply plus the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Trimmed completion text.
    pub text: String,
    /// Retrieved passages, best match first.
    pub sources: Vec<RetrievalResult>,
}

/// Retrieves passages for a question and asks the chat model to answer from
/// them.
#[derive(Clone)]
pub struct AnswerComposer {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
    temperature: f32,
}

impl AnswerComposer {
    /// Creates a composer with the default top-k and temperature.
    pub fn new(embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatProvider>) -> Self {
        Self {
            embedder,
            chat,
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Overrides how many passages are retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Overrides the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Passages retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embedder used for query vectors.
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Ranked passages for `question` without calling the chat model.
    pub fn retrieve(&self, index: &Index, question: &str) -> Result<Vec<RetrievalResult>> {
        retrieve_similar(self.embedder.as_ref(), index, question, self.top_k)
    }

    /// Answers one question from the indexed corpus.
    pub fn answer(&self, index: &Index, question: &str) -> Result<Answer> {
        let sources = self.retrieve(index, question)?;
        let messages = build_messages(question, &sources);
        let reply = self.chat.complete(&ChatRequest {
            messages: &messages,
            temperature: self.temperature,
        })?;
        info!(sources = sources.len(), "composed answer");
        Ok(Answer {
            text: reply.trim().to_string(),
            sources,
        })
    }

    /// Answers `question` and records both turns in `conversation`.
    ///
    /// The question is logged before the model is called, so a failed call
    /// leaves it without an answer.
    pub fn answer_in(
        &self,
        conversation: &mut Conversation,
        index: &Index,
        question: &str,
    ) -> Result<Answer> {
        conversation.push_user(question);
        let answer = self.answer(index, question)?;
        conversation.push_assistant(answer.text.clone());
        Ok(answer)
    }
}
