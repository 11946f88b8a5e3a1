use async_trait::async_trait;
use docuroute_core::tool::Tool;

pub const HUMAN_INTERVENTION_TOOL_NAME: &str = "human_intervention";

/// Hands the question back to the user when nothing else can answer it.
pub struct HumanInterventionTool {
    description: String,
}

impl HumanInterventionTool {
    pub fn new() -> Self {
        Self {
            description: "Use this tool when you need clarification from the user, \
                          or when no other tool can answer the question. \
                          Pass what you need the user to clarify as input."
                .into(),
        }
    }
}

impl Default for HumanInterventionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HumanInterventionTool {
    fn name(&self) -> &str {
        HUMAN_INTERVENTION_TOOL_NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: &str) -> String {
        let input = input.trim();
        if input.is_empty() {
            "I need more information from you to answer this question. Could you please clarify?".into()
        } else {
            format!("I need some clarification from you to answer this question: {input}")
        }
    }
}
