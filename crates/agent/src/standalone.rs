use docuroute_core::error::ProviderError;
use docuroute_core::message::{chat_history_to_str, ChatExchange, Message};
use docuroute_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::debug;

/// Rewrites a follow-up question so it makes sense without the chat history.
pub struct StandaloneQuestionRewriter {
    provider: Arc<dyn Provider>,
    model: String,
}

impl StandaloneQuestionRewriter {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// With no history the question comes back unchanged and no call is made.
    pub async fn rewrite(&self, question: &str, history: &[ChatExchange]) -> Result<String, ProviderError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = format!(
            "Given the following conversation and a follow up question, rephrase the follow up question \
             to be a standalone question that can be understood without the conversation. \
             Reply with the standalone question only.\n\n\
             Conversation:\n{}\n\nFollow up question: {}\n\nStandalone question:",
            chat_history_to_str(history),
            question
        );
        let request = ProviderRequest::new(self.model.clone(), vec![Message::user(prompt)]);
        let response = self.provider.complete(request).await?;

        let rewritten = response.message.content.trim();
        if rewritten.is_empty() {
            return Ok(question.to_string());
        }
        debug!(original = question, rewritten, "Rewrote follow-up question");
        Ok(rewritten.to_string())
    }
}
