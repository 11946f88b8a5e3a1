//! Answer synthesis — the `Synthesize` decision.

use async_trait::async_trait;
use docuroute_core::agent::{AgentState, CitedAnswer, StepHistory};
use docuroute_core::error::DecisionError;
use docuroute_core::message::{ChatExchange, Message};
use docuroute_core::provider::Provider;
use std::sync::Arc;
use tracing::debug;

use crate::llm::LlmCall;
use crate::parse::parse_structured;
use crate::prompt::{render_history, render_steps};

/// What the synthesizer sees.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub question: &'a str,
    pub chat_history: &'a [ChatExchange],
    pub tool_descriptions: &'a str,
    pub steps: &'a StepHistory,
}

impl<'a> SynthesisContext<'a> {
    pub fn from_state(state: &'a AgentState) -> Self {
        Self {
            question: &state.question,
            chat_history: &state.chat_history,
            tool_descriptions: &state.tool_descriptions,
            steps: &state.steps,
        }
    }
}

/// Turns the accumulated steps into a cited answer and judges whether it is final.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, ctx: &SynthesisContext<'_>) -> Result<CitedAnswer, DecisionError>;
}

/// Parse a cited answer from model output. A blank `source` becomes `label`.
pub fn parse_cited_answer(raw: &str, label: &str) -> Result<CitedAnswer, DecisionError> {
    let mut answer: CitedAnswer = parse_structured(raw, "cited answer")?;
    if answer.answer.trim().is_empty() {
        return Err(DecisionError::MalformedOutput {
            expected: "cited answer",
            reason: "answer is empty".into(),
            raw: raw.to_string(),
        });
    }
    if answer.source.trim().is_empty() {
        answer.source = label.to_string();
    }
    Ok(answer)
}

pub struct LlmAnswerSynthesizer {
    llm: LlmCall,
    label: String,
    max_parse_retries: u32,
}

impl LlmAnswerSynthesizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            llm: LlmCall::new(provider, model.into()),
            label: "docuroute".into(),
            max_parse_retries: 1,
        }
    }

    /// Source label used when the model leaves `source` blank.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.llm.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.llm.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_parse_retries(mut self, retries: u32) -> Self {
        self.max_parse_retries = retries;
        self
    }

    fn build_messages(ctx: &SynthesisContext<'_>) -> Vec<Message> {
        let system = format!(
            "You answer questions using only the outputs of the tools that were called. \
             The tools available were:\n\n{}\n\n\
             Respond with a single JSON object and nothing else:\n\
             {{\"source\": \"<who produced the answer>\", \"answer\": \"<the answer>\", \
             \"citations\": [{{\"label\": \"...\", \"details\": \"...\", \"link\": \"...\"}}], \
             \"is_final\": <true|false>, \"metadata\": {{}}}}\n\n\
             Set is_final to true only if the answer fully resolves the question. \
             If the tool outputs are not enough, give your best partial answer with is_final false.",
            ctx.tool_descriptions
        );
        let user = format!(
            "Chat history:\n{}\n\nQuestion: {}\n\nTool steps:\n{}",
            render_history(ctx.chat_history),
            ctx.question,
            render_steps(ctx.steps)
        );
        vec![Message::system(system), Message::user(user)]
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmAnswerSynthesizer {
    async fn synthesize(&self, ctx: &SynthesisContext<'_>) -> Result<CitedAnswer, DecisionError> {
        let label = self.label.as_str();
        let answer = self
            .llm
            .complete_parsed(Self::build_messages(ctx), self.max_parse_retries, |raw| {
                parse_cited_answer(raw, label)
            })
            .await?;
        debug!(is_final = answer.is_final, citations = answer.citations.len(), "Synthesized answer");
        Ok(answer)
    }
}
