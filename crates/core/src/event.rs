//! Domain event system — decoupled observation of agent runs.
//!
//! The controller and retriever publish events as they work. Subscribers
//! (loggers, UIs, tests) react without the publishers knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The selector picked a tool
    ToolSelected {
        tool_name: String,
        tool_input: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool finished running
    ToolExecuted {
        tool_name: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The synthesizer produced an answer
    AnswerSynthesized {
        is_final: bool,
        citations: usize,
        timestamp: DateTime<Utc>,
    },

    /// The fused retriever returned documents
    RetrievalCompleted {
        query: String,
        candidates: usize,
        returned: usize,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short snake_case name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolSelected { .. } => "tool_selected",
            Self::ToolExecuted { .. } => "tool_executed",
            Self::AnswerSynthesized { .. } => "answer_synthesized",
            Self::RetrievalCompleted { .. } => "retrieval_completed",
            Self::ErrorOccurred { .. } => "error_occurred",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
