//! Text rendering shared by the decision prompts.

use docuroute_core::agent::StepHistory;
use docuroute_core::message::{chat_history_to_str, ChatExchange};

/// Render completed steps as a transcript the model can read.
pub fn render_steps(steps: &StepHistory) -> String {
    if steps.is_empty() {
        return "(no tools called yet)".into();
    }

    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            format!(
                "Step {}:\nTool: {}\nInput: {}\nOutput: {}",
                i + 1,
                step.invocation.tool_name,
                step.invocation.tool_input,
                step.output.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_history(history: &[ChatExchange]) -> String {
    if history.is_empty() {
        return "(none)".into();
    }
    chat_history_to_str(history)
}
