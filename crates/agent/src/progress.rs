//! Human-readable progress text for an outstanding tool call.

use docuroute_core::agent::{CitedAnswer, Invocation};
use docuroute_core::tool::{REPORT_TOOL_PREFIX, RETRIEVAL_TOOL_PREFIX};

pub fn busy_text(invocation: &Invocation) -> String {
    let name = invocation.tool_name.as_str();
    if name.starts_with(RETRIEVAL_TOOL_PREFIX) {
        format!("Searching documents for '{}'", invocation.tool_input)
    } else if name.starts_with(REPORT_TOOL_PREFIX) {
        format!("Querying report for '{}'", invocation.tool_input)
    } else {
        "Thinking...".into()
    }
}

/// Interim, non-final answer shown while `invocation` runs.
pub fn busy_answer(invocation: &Invocation) -> CitedAnswer {
    CitedAnswer::interim(invocation.tool_name.clone(), busy_text(invocation))
}
