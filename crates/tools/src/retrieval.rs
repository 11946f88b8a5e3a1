//! Docset retrieval tool — answers questions from one document collection.

use async_trait::async_trait;
use docuroute_core::tool::{Tool, NOT_FOUND};
use docuroute_retrieval::FusedSummaryRetriever;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::naming::{docset_tool_description, docset_tool_name};
use crate::rag::RagAnswerer;

pub(crate) fn error_text(details: impl std::fmt::Display) -> String {
    format!(
        "There was an error. Please try a different question, or a different tool. Details: {details}"
    )
}

/// Runs the fused retriever over a docset, optionally answering from the results.
pub struct DocsetRetrievalTool {
    name: String,
    description: String,
    retriever: Arc<FusedSummaryRetriever>,
    answerer: Option<RagAnswerer>,
}

impl DocsetRetrievalTool {
    /// Build a tool for the docset `docset_name`, deriving its name and description.
    pub fn new(docset_name: &str, docset_description: &str, retriever: Arc<FusedSummaryRetriever>) -> Self {
        Self {
            name: docset_tool_name(docset_name),
            description: docset_tool_description(docset_name, docset_description),
            retriever,
            answerer: None,
        }
    }

    /// Answer from the retrieved documents instead of returning them.
    pub fn with_answerer(mut self, answerer: RagAnswerer) -> Self {
        self.answerer = Some(answerer);
        self
    }

    /// Override the description shown to the selector.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Tool for DocsetRetrievalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: &str) -> String {
        let question = input.trim();
        if question.is_empty() {
            return "Please specify a question that you want to answer from this docset".into();
        }

        let documents = match self.retriever.retrieve(question).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Retrieval failed");
                return error_text(e);
            }
        };
        debug!(tool = %self.name, documents = documents.len(), "Retrieved documents");

        if documents.is_empty() {
            return NOT_FOUND.into();
        }

        match &self.answerer {
            None => documents
                .iter()
                .map(|d| d.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Some(answerer) => match answerer.answer(question, &documents).await {
                Ok(answer) if !answer.is_empty() => answer,
                Ok(_) => NOT_FOUND.into(),
                Err(e) => {
                    warn!(tool = %self.name, error = %e, "Answer generation failed");
                    error_text(e)
                }
            },
        }
    }
}
