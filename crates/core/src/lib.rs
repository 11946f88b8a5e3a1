//! # docuroute core
//!
//! Domain types, traits, and error definitions for docuroute.
//! This crate has no framework dependencies: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here (LLM provider, chunk
//! index, document store, re-ranker, tool). Implementations live in their
//! respective crates, so tests swap in scripted stubs and the dependency
//! graph points inward on core.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod retrieval;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{DecisionError, Error, ProviderError, Result, RetrievalError, ToolError};
pub use message::{chat_history_to_str, ChatExchange, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use tool::{Tool, ToolRegistry, NOT_FOUND, REPORT_TOOL_PREFIX, RETRIEVAL_TOOL_PREFIX};
pub use retrieval::{
    ChunkIndex, ChunkRecord, DocumentStore, RerankScore, Reranker, Resolution, ResolvedDocument,
    SearchMode,
};
pub use agent::{AgentState, Citation, CitedAnswer, Invocation, StepHistory, StepState};
pub use event::{DomainEvent, EventBus};
