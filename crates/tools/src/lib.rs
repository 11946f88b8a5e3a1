//! Concrete tools the agent can call.
//!
//! - `retrieval_<docset>` — fused summary retrieval over a docset
//! - `query_<report>` — natural language questions over a report
//! - `human_intervention` — ask the user for clarification

pub mod human;
pub mod naming;
pub mod rag;
pub mod report;
pub mod retrieval;

pub use human::{HumanInterventionTool, HUMAN_INTERVENTION_TOOL_NAME};
pub use naming::{
    docset_tool_description, docset_tool_name, report_tool_description, report_tool_name, slugify,
};
pub use rag::RagAnswerer;
pub use report::{is_sql_like, ReportQuerier, ReportQueryTool};
pub use retrieval::DocsetRetrievalTool;
