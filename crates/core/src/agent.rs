//! Agent model types: invocations, steps, cited answers and per-query state.

use serde::{Deserialize, Serialize};
use crate::message::ChatExchange;

/// A reference backing part of an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Short label shown to the user (e.g., a document title)
    #[serde(default)]
    pub label: String,

    /// What in the source supports the answer
    #[serde(default)]
    pub details: String,

    /// Where to find the source, if anywhere
    #[serde(default)]
    pub link: String,
}

impl Citation {
    pub fn new(label: impl Into<String>, details: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            details: details.into(),
            link: link.into(),
        }
    }
}

/// An answer with its sources.
///
/// Always replaced as a whole; nothing mutates one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitedAnswer {
    /// Which component produced the answer
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub answer: String,

    #[serde(default)]
    pub citations: Vec<Citation>,

    /// Whether the producer judged the answer complete
    #[serde(default)]
    pub is_final: bool,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CitedAnswer {
    /// A non-final answer used to signal progress.
    pub fn interim(source: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            answer: answer.into(),
            ..Default::default()
        }
    }

    /// The same answer, marked non-final.
    pub fn into_non_final(self) -> Self {
        Self {
            is_final: false,
            ..self
        }
    }
}

/// The tool the agent decided to call, with its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invocation {
    pub tool_name: String,

    pub tool_input: String,

    /// Free-form reasoning text that accompanied the decision
    #[serde(default)]
    pub log: String,
}

impl Invocation {
    pub fn new(tool_name: impl Into<String>, tool_input: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input: tool_input.into(),
            log: String::new(),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }
}

// The log is commentary; two invocations calling the same tool with the
// same input are the same call.
impl PartialEq for Invocation {
    fn eq(&self, other: &Self) -> bool {
        self.tool_name == other.tool_name && self.tool_input == other.tool_input
    }
}

impl Eq for Invocation {}

/// One completed agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub invocation: Invocation,
    pub output: String,
}

impl StepState {
    pub fn new(invocation: Invocation, output: impl Into<String>) -> Self {
        Self {
            invocation,
            output: output.into(),
        }
    }
}

/// Append-only log of completed steps.
///
/// The only way to grow it is [`StepHistory::concat`]; entries are never
/// removed or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepHistory(Vec<StepState>);

impl StepHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta of new steps, in order.
    pub fn concat(&mut self, delta: Vec<StepState>) {
        self.0.extend(delta);
    }

    pub fn as_slice(&self) -> &[StepState] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&StepState> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepState> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a StepHistory {
    type Item = &'a StepState;
    type IntoIter = std::slice::Iter<'a, StepState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything one query run knows. Created per query and owned by that run.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub chat_history: Vec<ChatExchange>,

    pub question: String,

    /// Comma separated registered tool names
    pub tool_names: String,

    /// `name: description` lines for every registered tool
    pub tool_descriptions: String,

    /// `None` only before the first selection
    pub invocation: Option<Invocation>,

    pub steps: StepHistory,

    /// Latest answer, interim or final
    pub answer: CitedAnswer,
}

impl AgentState {
    pub fn new(question: impl Into<String>, chat_history: Vec<ChatExchange>) -> Self {
        Self {
            question: question.into(),
            chat_history,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tool_names: impl Into<String>, tool_descriptions: impl Into<String>) -> Self {
        self.tool_names = tool_names.into();
        self.tool_descriptions = tool_descriptions.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_equality_ignores_log() {
        let a = Invocation::new("retrieval_leases", "termination date").with_log("thinking A");
        let b = Invocation::new("retrieval_leases", "termination date").with_log("thinking B");
        assert_eq!(a, b);

        let c = Invocation::new("retrieval_leases", "start date");
        assert_ne!(a, c);
        let d = Invocation::new("query_rent_roll", "termination date");
        assert_ne!(a, d);
    }

    #[test]
    fn step_equality_uses_invocation_and_output() {
        let a = StepState::new(Invocation::new("t", "x").with_log("one"), "out");
        let b = StepState::new(Invocation::new("t", "x").with_log("two"), "out");
        let c = StepState::new(Invocation::new("t", "x"), "other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn step_history_concat_appends_in_order() {
        let mut history = StepHistory::new();
        history.concat(vec![StepState::new(Invocation::new("a", "1"), "r1")]);
        history.concat(vec![
            StepState::new(Invocation::new("b", "2"), "r2"),
            StepState::new(Invocation::new("c", "3"), "r3"),
        ]);
        history.concat(vec![]);

        let names: Vec<_> = history.iter().map(|s| s.invocation.tool_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(history.last().map(|s| s.output.as_str()), Some("r3"));
    }

    #[test]
    fn cited_answer_deserializes_with_defaults() {
        let answer: CitedAnswer = serde_json::from_str(r#"{"answer":"42"}"#).unwrap();
        assert_eq!(answer.answer, "42");
        assert!(!answer.is_final);
        assert!(answer.citations.is_empty());
        assert!(answer.metadata.is_empty());
    }

    #[test]
    fn into_non_final_keeps_content() {
        let answer = CitedAnswer {
            source: "synth".into(),
            answer: "March 2025".into(),
            citations: vec![Citation::new("Lease", "Section 2", "")],
            is_final: true,
            metadata: Default::default(),
        };
        let forced = answer.clone().into_non_final();
        assert!(!forced.is_final);
        assert_eq!(forced.answer, answer.answer);
        assert_eq!(forced.citations, answer.citations);
    }

    #[test]
    fn agent_state_starts_without_invocation() {
        let state = AgentState::new("Q?", vec![]).with_tools("a, b", "a: x\nb: y");
        assert!(state.invocation.is_none());
        assert!(state.steps.is_empty());
        assert_eq!(state.tool_names, "a, b");
    }
}
