//! Error types for the docuroute domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all docuroute operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Structured LLM decisions ---
    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the retrieval collaborators (index, stores, re-ranker, embedder).
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Vector search failed: {0}")]
    Search(String),

    #[error("Document store lookup failed for '{id}': {reason}")]
    Store { id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Re-ranking failed: {0}")]
    Rerank(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid docset: {0}")]
    InvalidDocset(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

/// Failures of the LLM-backed decision components (tool selection, answer synthesis).
///
/// `MalformedOutput` and `UnknownTool` are recoverable by re-prompting;
/// `Provider` is a transport failure of the underlying completion call.
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    #[error("Malformed {expected} output: {reason}")]
    MalformedOutput {
        expected: &'static str,
        reason: String,
        raw: String,
    },

    #[error("Selected tool '{name}' is not registered")]
    UnknownTool { name: String },

    #[error("Decision provider failed: {0}")]
    Provider(#[from] ProviderError),
}

impl DecisionError {
    /// Whether a corrective re-prompt may fix this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedOutput { .. } | Self::UnknownTool { .. })
    }
}
