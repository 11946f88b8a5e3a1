//! The tool-routing agent.
//!
//! Each question runs through a small state machine:
//!
//! 1. **Select** one registered tool and its input (never answer directly)
//! 2. **Execute** the tool; its text output becomes a new step
//! 3. **Synthesize** a cited answer from all steps and judge whether it is final
//! 4. Not final → back to 1; final → done
//!
//! Runs are always bounded by a [`StepBudget`] and can be cancelled.

pub mod controller;
mod llm;
pub mod parse;
pub mod progress;
pub mod prompt;
pub mod selector;
pub mod standalone;
pub mod stream_event;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{
    transition, AgentController, AgentRun, ControllerError, Effect, Event, Phase, StepBudget,
    Termination,
};
pub use progress::busy_text;
pub use selector::{LlmToolSelector, SelectionContext, ToolSelector};
pub use standalone::StandaloneQuestionRewriter;
pub use stream_event::AgentStreamEvent;
pub use synthesizer::{AnswerSynthesizer, LlmAnswerSynthesizer, SynthesisContext};
