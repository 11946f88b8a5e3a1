//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what a caller of `run_with` sees while the
//! controller works: progress while a tool runs, each tool result, each
//! synthesized answer, and a closing `done`.

use docuroute_core::agent::CitedAnswer;
use serde::{Deserialize, Serialize};

/// Events emitted by the controller during a run.
///
/// - `progress`    — interim answer while a tool runs
/// - `tool_result` — tool execution completed
/// - `answer`      — the synthesizer produced an answer
/// - `done`        — the run is over
/// - `error`       — a decision component failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Progress { answer: CitedAnswer },

    ToolResult {
        name: String,
        input: String,
        output: String,
    },

    Answer { answer: CitedAnswer },

    /// Final metadata.
    Done { steps: usize, termination: String },

    Error { message: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::ToolResult { .. } => "tool_result",
            Self::Answer { .. } => "answer",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serialization() {
        let event = AgentStreamEvent::Progress {
            answer: CitedAnswer::interim("retrieval_leases", "Searching documents for 'x'"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"progress""#));
        assert!(json.contains("Searching documents"));
    }

    #[test]
    fn done_serialization() {
        let event = AgentStreamEvent::Done {
            steps: 2,
            termination: "final".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""steps":2"#));
    }

    #[test]
    fn event_type_names() {
        let names: Vec<_> = [
            AgentStreamEvent::Progress { answer: CitedAnswer::default() },
            AgentStreamEvent::ToolResult {
                name: "a".into(),
                input: "b".into(),
                output: "c".into(),
            },
            AgentStreamEvent::Answer { answer: CitedAnswer::default() },
            AgentStreamEvent::Done {
                steps: 0,
                termination: "cancelled".into(),
            },
            AgentStreamEvent::Error { message: "x".into() },
        ]
        .iter()
        .map(|e| e.event_type())
        .collect();
        assert_eq!(names, vec!["progress", "tool_result", "answer", "done", "error"]);
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"tool_result","name":"retrieval_leases","input":"q","output":"r"}"#;
        let event: AgentStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentStreamEvent::ToolResult { name, .. } => assert_eq!(name, "retrieval_leases"),
            _ => panic!("Wrong variant"),
        }
    }
}
