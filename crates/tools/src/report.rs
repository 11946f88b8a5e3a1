//! Report query tool — natural language questions over a tabular report.

use async_trait::async_trait;
use docuroute_core::error::ToolError;
use docuroute_core::tool::{Tool, NOT_FOUND};
use std::sync::Arc;
use tracing::warn;

use crate::naming::{report_tool_description, report_tool_name};
use crate::retrieval::error_text;

/// Answers a natural language question against one report.
///
/// Translation to SQL (or anything else) happens behind this trait.
/// `Ok(None)` means the report holds no answer.
///
/// No implementation ships with docuroute. To expose a report, wrap your
/// querier in [`ReportQueryTool::new`] and register it in the `ToolRegistry`
/// next to the docset tool (the CLI's `ask` command registers its tools in `run`).
#[async_trait]
pub trait ReportQuerier: Send + Sync {
    async fn query(&self, question: &str) -> Result<Option<String>, ToolError>;
}

/// True for input that already looks like a SQL query.
pub fn is_sql_like(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input.starts_with("select") && input.contains("from")
}

pub struct ReportQueryTool {
    name: String,
    description: String,
    querier: Arc<dyn ReportQuerier>,
}

impl ReportQueryTool {
    pub fn new(
        report_name: &str,
        table_info: &str,
        max_description_chars: usize,
        querier: Arc<dyn ReportQuerier>,
    ) -> Self {
        Self {
            name: report_tool_name(report_name),
            description: report_tool_description(report_name, table_info, max_description_chars),
            querier,
        }
    }
}

#[async_trait]
impl Tool for ReportQueryTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: &str) -> String {
        if is_sql_like(input) {
            return "Looks like you passed in a SQL query. This tool takes natural language questions, \
                    and automatically translates them to SQL queries. \
                    Please try again with a natural language version of this question."
                .into();
        }

        match self.querier.query(input.trim()).await {
            Ok(Some(answer)) if !answer.trim().is_empty() => answer,
            Ok(_) => NOT_FOUND.into(),
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Report query failed");
                error_text(e)
            }
        }
    }
}
