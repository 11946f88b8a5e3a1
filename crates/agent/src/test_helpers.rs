//! Shared test helpers: scripted provider, decision stubs and tools.

use async_trait::async_trait;
use docuroute_core::agent::{CitedAnswer, Invocation};
use docuroute_core::error::{DecisionError, ProviderError};
use docuroute_core::message::Message;
use docuroute_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use docuroute_core::tool::Tool;
use std::sync::Mutex;
use std::time::Duration;

use crate::selector::{SelectionContext, ToolSelector};
use crate::synthesizer::{AnswerSynthesizer, SynthesisContext};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// A provider whose only call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().get(index).cloned()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);

        match self.responses.get(call) {
            Some(response) => response.clone(),
            None => panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                self.responses.len()
            ),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Returns the scripted invocations in order, repeating the last one.
/// Records how many steps each call saw.
pub struct ScriptedSelector {
    script: Vec<Result<Invocation, DecisionError>>,
    seen_steps: Mutex<Vec<usize>>,
}

impl ScriptedSelector {
    pub fn new(script: Vec<Result<Invocation, DecisionError>>) -> Self {
        assert!(!script.is_empty(), "ScriptedSelector needs at least one entry");
        Self {
            script,
            seen_steps: Mutex::new(Vec::new()),
        }
    }

    pub fn always(invocation: Invocation) -> Self {
        Self::new(vec![Ok(invocation)])
    }

    pub fn seen_steps(&self) -> Vec<usize> {
        self.seen_steps.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolSelector for ScriptedSelector {
    async fn select(&self, ctx: &SelectionContext<'_>) -> Result<Invocation, DecisionError> {
        let mut seen = self.seen_steps.lock().unwrap();
        let call = seen.len().min(self.script.len() - 1);
        seen.push(ctx.steps.len());
        self.script[call].clone()
    }
}

/// Returns the scripted answers in order, repeating the last one.
pub struct ScriptedSynthesizer {
    script: Vec<Result<CitedAnswer, DecisionError>>,
    calls: Mutex<usize>,
}

impl ScriptedSynthesizer {
    pub fn new(script: Vec<Result<CitedAnswer, DecisionError>>) -> Self {
        assert!(!script.is_empty(), "ScriptedSynthesizer needs at least one entry");
        Self {
            script,
            calls: Mutex::new(0),
        }
    }

    /// Never satisfied.
    pub fn never_final(text: &str) -> Self {
        Self::new(vec![Ok(answer(text, false))])
    }

    pub fn final_answer(text: &str) -> Self {
        Self::new(vec![Ok(answer(text, true))])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AnswerSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, _ctx: &SynthesisContext<'_>) -> Result<CitedAnswer, DecisionError> {
        let mut calls = self.calls.lock().unwrap();
        let call = (*calls).min(self.script.len() - 1);
        *calls += 1;
        self.script[call].clone()
    }
}

pub fn answer(text: &str, is_final: bool) -> CitedAnswer {
    CitedAnswer {
        source: "scripted".into(),
        answer: text.into(),
        is_final,
        ..Default::default()
    }
}

/// Echoes its input with a prefix.
pub struct EchoTool {
    pub name: &'static str,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echoes its input"
    }

    async fn run(&self, input: &str) -> String {
        format!("echo: {input}")
    }
}

/// Sleeps before answering.
pub struct SlowTool {
    pub name: &'static str,
    pub delay: Duration,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Takes its time"
    }

    async fn run(&self, input: &str) -> String {
        tokio::time::sleep(self.delay).await;
        format!("slow: {input}")
    }
}
