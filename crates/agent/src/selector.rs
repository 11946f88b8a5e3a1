//! Tool selection — the `SelectTool` decision.

use async_trait::async_trait;
use docuroute_core::agent::{AgentState, Invocation, StepHistory};
use docuroute_core::error::DecisionError;
use docuroute_core::message::{ChatExchange, Message};
use docuroute_core::provider::Provider;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::llm::LlmCall;
use crate::parse::parse_structured;
use crate::prompt::{render_history, render_steps};

/// What the selector sees. Borrowed from the run's `AgentState`.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub question: &'a str,
    pub chat_history: &'a [ChatExchange],
    /// Comma separated
    pub tool_names: &'a str,
    pub tool_descriptions: &'a str,
    pub steps: &'a StepHistory,
}

impl<'a> SelectionContext<'a> {
    pub fn from_state(state: &'a AgentState) -> Self {
        Self {
            question: &state.question,
            chat_history: &state.chat_history,
            tool_names: &state.tool_names,
            tool_descriptions: &state.tool_descriptions,
            steps: &state.steps,
        }
    }

    pub fn is_registered(&self, tool_name: &str) -> bool {
        self.tool_names.split(',').any(|name| name.trim() == tool_name)
    }
}

/// Picks exactly one tool to call next. Never answers directly.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    async fn select(&self, ctx: &SelectionContext<'_>) -> Result<Invocation, DecisionError>;
}

#[derive(Deserialize)]
struct RawInvocation {
    tool_name: String,
    #[serde(default)]
    tool_input: serde_json::Value,
}

/// Parse and validate an invocation from model output.
pub fn parse_invocation(raw: &str, ctx: &SelectionContext<'_>) -> Result<Invocation, DecisionError> {
    let parsed: RawInvocation = parse_structured(raw, "invocation")?;

    let tool_name = parsed.tool_name.trim();
    if tool_name.is_empty() {
        return Err(DecisionError::MalformedOutput {
            expected: "invocation",
            reason: "tool_name is empty".into(),
            raw: raw.to_string(),
        });
    }
    if !ctx.is_registered(tool_name) {
        return Err(DecisionError::UnknownTool {
            name: tool_name.to_string(),
        });
    }

    // Models sometimes send structured input; the tool contract is text.
    let tool_input = match parsed.tool_input {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    Ok(Invocation::new(tool_name, tool_input).with_log(raw.trim()))
}

/// LLM-backed selector: prompt, parse JSON, re-prompt on bad output.
pub struct LlmToolSelector {
    llm: LlmCall,
    max_parse_retries: u32,
}

impl LlmToolSelector {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            llm: LlmCall::new(provider, model.into()),
            max_parse_retries: 1,
        }
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

    fn build_messages(ctx: &SelectionContext<'_>) -> Vec<Message> {
        let system = format!(
            "You route questions to tools. You have access to the following tools:\n\n{}\n\n\
             Always pick exactly one tool, even if you think you already know the answer. \
             Use the previous steps to avoid repeating a call that did not help.\n\n\
             Respond with a single JSON object and nothing else:\n\
             {{\"tool_name\": \"<one of: {}>\", \"tool_input\": \"<the COMPLETE question for the tool>\"}}",
            ctx.tool_descriptions, ctx.tool_names
        );
        let user = format!(
            "Chat history:\n{}\n\nQuestion: {}\n\nPrevious steps:\n{}",
            render_history(ctx.chat_history),
            ctx.question,
            render_steps(ctx.steps)
        );
        vec![Message::system(system), Message::user(user)]
    }
}

#[async_trait]
impl ToolSelector for LlmToolSelector {
    async fn select(&self, ctx: &SelectionContext<'_>) -> Result<Invocation, DecisionError> {
        let invocation = self
            .llm
            .complete_parsed(Self::build_messages(ctx), self.max_parse_retries, |raw| {
                parse_invocation(raw, ctx)
            })
            .await?;
        debug!(tool = %invocation.tool_name, input = %invocation.tool_input, "Selected tool");
        Ok(invocation)
    }
}
