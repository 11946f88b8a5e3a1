//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are the only way the agent gathers evidence: searching a docset,
//! querying a report, or asking a human. A tool never fails towards the
//! agent; internal errors come back as explanatory text.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Name prefix shared by all docset retrieval tools.
pub const RETRIEVAL_TOOL_PREFIX: &str = "retrieval_";

/// Name prefix shared by all report query tools.
pub const REPORT_TOOL_PREFIX: &str = "query_";

/// Returned by tools when they ran fine but found nothing useful.
pub const NOT_FOUND: &str = "Sorry, I could not find any relevant information for this input.";

/// The core Tool trait.
///
/// Each tool is registered in the [`ToolRegistry`] under its name, which
/// the tool selector must reproduce exactly to route to it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique, stable name of this tool (e.g., "retrieval_leases").
    fn name(&self) -> &str;

    /// A description of what this tool does (shown to the tool selector).
    fn description(&self) -> &str;

    /// Run the tool. Must not fail: errors are reported as text.
    async fn run(&self, input: &str) -> String;
}

/// A registry of available tools.
///
/// Assembled once at startup and read-only afterwards. Listings preserve
/// registration order so prompts are stable across runs.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Comma separated tool names, as shown to the selector.
    pub fn names_listing(&self) -> String {
        self.names().join(", ")
    }

    /// One `name: description` line per tool.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool. Unknown names produce explanatory text rather than an error.
    pub async fn run(&self, name: &str, input: &str) -> String {
        match self.get(name) {
            Some(tool) => tool.run(input).await,
            None => {
                tracing::warn!(tool = name, "Requested tool is not registered");
                format!(
                    "There is no tool named '{}'. Please pick one of: {}",
                    name,
                    self.names_listing()
                )
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
