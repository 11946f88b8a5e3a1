//! The tool-routing controller.
//!
//! ```text
//! SelectTool ──▶ ExecuteTool ──▶ Synthesize ──▶ Terminal
//!     ▲                              │ (not final)
//!     └──────────────────────────────┘
//! ```
//!
//! [`transition`] is pure: current phase plus an event gives the next phase
//! and the effects to apply. [`AgentController`] drives it, producing events
//! by calling the selector, the tools and the synthesizer, and applying the
//! effects to the run's `AgentState`.
//!
//! Every run is bounded by a [`StepBudget`]. The step cap is checked before
//! each selection; the deadline is checked at every phase boundary and also
//! races each in-flight phase, as does the cancellation token.

use chrono::Utc;
use docuroute_config::AgentConfig;
use docuroute_core::agent::{AgentState, CitedAnswer, Invocation, StepHistory, StepState};
use docuroute_core::error::DecisionError;
use docuroute_core::event::{DomainEvent, EventBus};
use docuroute_core::message::ChatExchange;
use docuroute_core::tool::ToolRegistry;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::busy_answer;
use crate::selector::{SelectionContext, ToolSelector};
use crate::standalone::StandaloneQuestionRewriter;
use crate::stream_event::AgentStreamEvent;
use crate::synthesizer::{AnswerSynthesizer, SynthesisContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    SelectTool,
    ExecuteTool(Invocation),
    Synthesize,
    Terminal,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectTool => "select_tool",
            Self::ExecuteTool(_) => "execute_tool",
            Self::Synthesize => "synthesize",
            Self::Terminal => "terminal",
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone)]
pub enum Termination {
    /// The synthesizer judged its answer final
    Final,
    StepBudgetExhausted,
    TimeBudgetExhausted,
    Cancelled,
    /// Selection or synthesis failed for good
    DecisionFailed { error: DecisionError },
}

impl Termination {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::StepBudgetExhausted => "step_budget_exhausted",
            Self::TimeBudgetExhausted => "time_budget_exhausted",
            Self::Cancelled => "cancelled",
            Self::DecisionFailed { .. } => "decision_failed",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecisionFailed { error } => write!(f, "decision_failed: {error}"),
            other => f.write_str(other.label()),
        }
    }
}

/// What happened in the current phase.
#[derive(Debug, Clone)]
pub enum Event {
    Selected(Invocation),
    Executed { output: String },
    Synthesized(CitedAnswer),
    /// Budget, cancellation or a failed decision ends the run
    Stopped(Termination),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Selected(_) => "selected",
            Self::Executed { .. } => "executed",
            Self::Synthesized(_) => "synthesized",
            Self::Stopped(_) => "stopped",
        }
    }
}

/// A change the driver applies to the run.
#[derive(Debug, Clone)]
pub enum Effect {
    SetInvocation(Invocation),
    /// Interim answer while a tool runs; not stored
    Progress(CitedAnswer),
    /// Delta concatenated onto the step history
    AppendSteps(Vec<StepState>),
    SetAnswer(CitedAnswer),
    /// Mark the current answer non-final
    DemoteAnswer,
    Finish(Termination),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Run already terminated, got event '{event}'")]
    AlreadyTerminal { event: &'static str },

    #[error("Event '{event}' is not valid in phase '{phase}'")]
    InvalidTransition {
        phase: &'static str,
        event: &'static str,
    },
}

/// The controller's state machine.
pub fn transition(phase: &Phase, event: Event) -> Result<(Phase, Vec<Effect>), ControllerError> {
    match (phase, event) {
        (Phase::Terminal, event) => Err(ControllerError::AlreadyTerminal { event: event.name() }),

        (_, Event::Stopped(reason)) => Ok((
            Phase::Terminal,
            vec![Effect::DemoteAnswer, Effect::Finish(reason)],
        )),

        (Phase::SelectTool, Event::Selected(invocation)) => Ok((
            Phase::ExecuteTool(invocation.clone()),
            vec![
                Effect::Progress(busy_answer(&invocation)),
                Effect::SetInvocation(invocation),
            ],
        )),

        (Phase::ExecuteTool(invocation), Event::Executed { output }) => Ok((
            Phase::Synthesize,
            vec![Effect::AppendSteps(vec![StepState::new(invocation.clone(), output)])],
        )),

        (Phase::Synthesize, Event::Synthesized(answer)) if answer.is_final => Ok((
            Phase::Terminal,
            vec![Effect::SetAnswer(answer), Effect::Finish(Termination::Final)],
        )),

        (Phase::Synthesize, Event::Synthesized(answer)) => {
            Ok((Phase::SelectTool, vec![Effect::SetAnswer(answer)]))
        }

        (phase, event) => Err(ControllerError::InvalidTransition {
            phase: phase.name(),
            event: event.name(),
        }),
    }
}

/// Upper bounds on one run. Both always apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    /// Tool executions allowed
    pub max_steps: usize,
    /// Wall-clock limit for the whole run
    pub max_duration: Duration,
}

impl StepBudget {
    pub fn new(max_steps: usize, max_duration: Duration) -> Self {
        Self {
            max_steps,
            max_duration,
        }
    }
}

impl From<&AgentConfig> for StepBudget {
    fn from(config: &AgentConfig) -> Self {
        Self::new(config.max_steps, config.max_duration())
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// The question the loop worked on (after any standalone rewrite)
    pub question: String,
    pub answer: CitedAnswer,
    pub steps: StepHistory,
    /// Always `Terminal`
    pub phase: Phase,
    pub termination: Termination,
}

pub struct AgentController {
    selector: Arc<dyn ToolSelector>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    tools: Arc<ToolRegistry>,
    budget: StepBudget,
    rewriter: Option<StandaloneQuestionRewriter>,
    event_bus: Option<Arc<EventBus>>,
}

impl AgentController {
    pub fn new(
        selector: Arc<dyn ToolSelector>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        tools: Arc<ToolRegistry>,
        budget: StepBudget,
    ) -> Self {
        Self {
            selector,
            synthesizer,
            tools,
            budget,
            rewriter: None,
            event_bus: None,
        }
    }

    /// Rewrite follow-up questions into standalone ones before the loop starts.
    pub fn with_rewriter(mut self, rewriter: StandaloneQuestionRewriter) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn budget(&self) -> StepBudget {
        self.budget
    }

    /// Answer `question` with no cancellation and no stream.
    pub async fn run(&self, question: &str, chat_history: Vec<ChatExchange>) -> Result<AgentRun, ControllerError> {
        self.run_with(question, chat_history, CancellationToken::new(), None).await
    }

    /// Answer `question`, honoring `cancel` and streaming progress to `events`.
    pub async fn run_with(
        &self,
        question: &str,
        chat_history: Vec<ChatExchange>,
        cancel: CancellationToken,
        events: Option<mpsc::Sender<AgentStreamEvent>>,
    ) -> Result<AgentRun, ControllerError> {
        let started = Instant::now();
        // A huge configured duration would overflow; treat it as "no deadline in practice".
        let deadline = started
            .checked_add(self.budget.max_duration)
            .unwrap_or_else(|| started + Duration::from_secs(60 * 60 * 24 * 365));

        let question = self.standalone_question(question, &chat_history, &cancel, deadline).await;
        let mut state = AgentState::new(question, chat_history)
            .with_tools(self.tools.names_listing(), self.tools.render_descriptions());

        info!(
            tools = self.tools.len(),
            max_steps = self.budget.max_steps,
            max_duration_secs = self.budget.max_duration.as_secs(),
            "Agent run starting"
        );

        let mut phase = Phase::SelectTool;
        let mut termination = None;

        while phase != Phase::Terminal {
            let event = match &phase {
                Phase::SelectTool => self.select(&state, &cancel, deadline).await,
                Phase::ExecuteTool(invocation) => self.execute(invocation, &cancel, deadline).await,
                Phase::Synthesize => self.synthesize(&state, &cancel, deadline).await,
                Phase::Terminal => break,
            };
            debug!(phase = phase.name(), event = event.name(), "Transition");

            let (next, effects) = transition(&phase, event)?;
            for effect in effects {
                self.apply(effect, &mut state, &mut termination, events.as_ref());
            }
            phase = next;
        }

        let termination = termination.unwrap_or(Termination::Final);
        info!(
            steps = state.steps.len(),
            termination = termination.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Agent run finished"
        );
        emit(
            events.as_ref(),
            AgentStreamEvent::Done {
                steps: state.steps.len(),
                termination: termination.label().to_string(),
            },
        );

        Ok(AgentRun {
            question: state.question,
            answer: state.answer,
            steps: state.steps,
            phase,
            termination,
        })
    }

    async fn standalone_question(
        &self,
        question: &str,
        chat_history: &[ChatExchange],
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> String {
        let Some(rewriter) = &self.rewriter else {
            return question.to_string();
        };
        match guarded(rewriter.rewrite(question, chat_history), cancel, deadline).await {
            Ok(Ok(rewritten)) => rewritten,
            Ok(Err(e)) => {
                warn!(error = %e, "Standalone rewrite failed, using the original question");
                question.to_string()
            }
            // The loop notices the interruption at its first boundary.
            Err(_) => question.to_string(),
        }
    }

    async fn select(&self, state: &AgentState, cancel: &CancellationToken, deadline: Instant) -> Event {
        if let Some(stop) = interrupted(cancel, deadline) {
            return Event::Stopped(stop);
        }
        if state.steps.len() >= self.budget.max_steps {
            return Event::Stopped(Termination::StepBudgetExhausted);
        }

        let ctx = SelectionContext::from_state(state);
        match guarded(self.selector.select(&ctx), cancel, deadline).await {
            Err(stop) => Event::Stopped(stop),
            Ok(Err(error)) => Event::Stopped(Termination::DecisionFailed { error }),
            Ok(Ok(invocation)) if !self.tools.contains(&invocation.tool_name) => {
                Event::Stopped(Termination::DecisionFailed {
                    error: DecisionError::UnknownTool {
                        name: invocation.tool_name,
                    },
                })
            }
            Ok(Ok(invocation)) => {
                info!(tool = %invocation.tool_name, input = %invocation.tool_input, "Tool selected");
                self.publish(DomainEvent::ToolSelected {
                    tool_name: invocation.tool_name.clone(),
                    tool_input: invocation.tool_input.clone(),
                    timestamp: Utc::now(),
                });
                Event::Selected(invocation)
            }
        }
    }

    async fn execute(&self, invocation: &Invocation, cancel: &CancellationToken, deadline: Instant) -> Event {
        if let Some(stop) = interrupted(cancel, deadline) {
            return Event::Stopped(stop);
        }

        let started = Instant::now();
        let run = self.tools.run(&invocation.tool_name, &invocation.tool_input);
        match guarded(run, cancel, deadline).await {
            Err(stop) => Event::Stopped(stop),
            Ok(output) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                debug!(tool = %invocation.tool_name, duration_ms, "Tool executed");
                self.publish(DomainEvent::ToolExecuted {
                    tool_name: invocation.tool_name.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                Event::Executed { output }
            }
        }
    }

    async fn synthesize(&self, state: &AgentState, cancel: &CancellationToken, deadline: Instant) -> Event {
        if let Some(stop) = interrupted(cancel, deadline) {
            return Event::Stopped(stop);
        }

        let ctx = SynthesisContext::from_state(state);
        match guarded(self.synthesizer.synthesize(&ctx), cancel, deadline).await {
            Err(stop) => Event::Stopped(stop),
            Ok(Err(error)) => Event::Stopped(Termination::DecisionFailed { error }),
            Ok(Ok(answer)) => {
                self.publish(DomainEvent::AnswerSynthesized {
                    is_final: answer.is_final,
                    citations: answer.citations.len(),
                    timestamp: Utc::now(),
                });
                Event::Synthesized(answer)
            }
        }
    }

    fn apply(
        &self,
        effect: Effect,
        state: &mut AgentState,
        termination: &mut Option<Termination>,
        events: Option<&mpsc::Sender<AgentStreamEvent>>,
    ) {
        match effect {
            Effect::SetInvocation(invocation) => state.invocation = Some(invocation),
            Effect::Progress(answer) => emit(events, AgentStreamEvent::Progress { answer }),
            Effect::AppendSteps(delta) => {
                for step in &delta {
                    emit(
                        events,
                        AgentStreamEvent::ToolResult {
                            name: step.invocation.tool_name.clone(),
                            input: step.invocation.tool_input.clone(),
                            output: step.output.clone(),
                        },
                    );
                }
                state.steps.concat(delta);
            }
            Effect::SetAnswer(answer) => {
                emit(events, AgentStreamEvent::Answer { answer: answer.clone() });
                state.answer = answer;
            }
            Effect::DemoteAnswer => {
                state.answer = std::mem::take(&mut state.answer).into_non_final();
            }
            Effect::Finish(reason) => {
                if let Termination::DecisionFailed { error } = &reason {
                    warn!(error = %error, "Agent decision failed");
                    self.publish(DomainEvent::ErrorOccurred {
                        context: "agent".into(),
                        error_message: error.to_string(),
                        timestamp: Utc::now(),
                    });
                    emit(events, AgentStreamEvent::Error { message: error.to_string() });
                }
                *termination = Some(reason);
            }
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn interrupted(cancel: &CancellationToken, deadline: Instant) -> Option<Termination> {
    if cancel.is_cancelled() {
        Some(Termination::Cancelled)
    } else if Instant::now() >= deadline {
        Some(Termination::TimeBudgetExhausted)
    } else {
        None
    }
}

/// Race `fut` against cancellation and the deadline.
async fn guarded<F: Future>(fut: F, cancel: &CancellationToken, deadline: Instant) -> Result<F::Output, Termination> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Termination::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Err(Termination::TimeBudgetExhausted),
        output = fut => Ok(output),
    }
}

/// Stream events never block the run: a full or closed channel drops them.
fn emit(events: Option<&mpsc::Sender<AgentStreamEvent>>, event: AgentStreamEvent) {
    let Some(tx) = events else {
        return;
    };
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(event)) => {
            debug!(event = event.event_type(), "Stream consumer is behind, dropping event");
        }
        // Receiver gone means nobody is watching
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
