//! One structured LLM call with corrective re-prompting.

use docuroute_core::error::DecisionError;
use docuroute_core::message::Message;
use docuroute_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider plus the request settings shared by the decision components.
pub(crate) struct LlmCall {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl LlmCall {
    pub fn new(provider: Arc<dyn Provider>, model: String) -> Self {
        Self {
            provider,
            model,
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Complete `messages` and parse the reply.
    ///
    /// A recoverable parse failure appends the bad reply and a correction to
    /// the conversation and asks again, up to `max_retries` times.
    pub async fn complete_parsed<T>(
        &self,
        mut messages: Vec<Message>,
        max_retries: u32,
        parse: impl Fn(&str) -> Result<T, DecisionError>,
    ) -> Result<T, DecisionError> {
        let mut attempt = 0;
        loop {
            let request = ProviderRequest::new(self.model.clone(), messages.clone())
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);
            let response = self.provider.complete(request).await?;
            let raw = response.message.content;

            match parse(&raw) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Re-prompting after unusable output");
                    messages.push(Message::assistant(raw));
                    messages.push(Message::user(format!(
                        "Your previous response could not be used: {e}. \
                         Reply again with only the JSON object in the requested format."
                    )));
                }
                Err(e) => {
                    debug!(error = %e, "Giving up on structured output");
                    return Err(e);
                }
            }
        }
    }
}
