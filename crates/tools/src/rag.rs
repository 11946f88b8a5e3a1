//! Answer a question from retrieved documents with one LLM call.

use docuroute_core::error::ProviderError;
use docuroute_core::message::Message;
use docuroute_core::provider::{Provider, ProviderRequest};
use docuroute_core::retrieval::ResolvedDocument;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using only the provided context. \
If the context does not contain the answer, say that you could not find it. \
Answer concisely and do not mention the context itself.";

/// Simple retrieval-augmented answering.
pub struct RagAnswerer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl RagAnswerer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Render documents as numbered context blocks.
    pub fn render_context(documents: &[ResolvedDocument]) -> String {
        documents
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("[{}] {}", i + 1, doc.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Ask the provider to answer `question` from `documents`. Returns the trimmed answer text.
    pub async fn answer(
        &self,
        question: &str,
        documents: &[ResolvedDocument],
    ) -> Result<String, ProviderError> {
        let prompt = format!(
            "CONTEXT:\n{}\n\nQUESTION: {}\n\nANSWER:",
            Self::render_context(documents),
            question
        );
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        debug!(model = %self.model, documents = documents.len(), "Answering from documents");
        let response = self.provider.complete(request).await?;
        Ok(response.message.content.trim().to_string())
    }
}
