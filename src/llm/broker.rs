use crate::error::{Result, TabijiError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::LlmTool;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tool rounds serviced per call to [`LlmBroker::generate`] unless overridden.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 1;

/// Drives completions against a gateway, servicing tool calls in between.
///
/// Each tool round services only the first tool call of a response. Once
/// `max_tool_rounds` rounds have run, the follow-up completion is requested
/// without advertising tools, so one `generate` issues at most
/// `max_tool_rounds + 1` completion calls.
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
    max_tool_rounds: usize,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text response from LLM
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Arc<dyn LlmTool>]>,
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();
        let mut current_messages = messages.to_vec();
        let mut rounds = 0;

        loop {
            let advertised = if rounds < self.max_tool_rounds { tools } else { None };

            debug!(round = rounds, messages = current_messages.len(), "Requesting completion");
            let response = self
                .gateway
                .complete(&self.model, &current_messages, advertised, &config)
                .await?;

            let Some(tools) = advertised else {
                return final_content(response);
            };
            let first_call = response.tool_calls.first().cloned();
            let Some(tool_call) = first_call else {
                return final_content(response);
            };

            if response.tool_calls.len() > 1 {
                debug!(
                    ignored = response.tool_calls.len() - 1,
                    "Only the first tool call is serviced"
                );
            }

            let Some(tool) = tools.iter().find(|t| t.matches(&tool_call.name)) else {
                warn!("Tool not found: {}", tool_call.name);
                return final_content(response);
            };

            info!("Executing tool: {}", tool_call.name);
            let output = match tool.run(&tool_call.arguments).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(tool = %tool_call.name, error = %e, "Tool execution failed");
                    json!({ "error": e.to_string() })
                }
            };

            let call_id = tool_call.id.clone();
            current_messages.push(LlmMessage::assistant_tool_call(response.content, tool_call));
            current_messages.push(LlmMessage::tool_result(call_id, serde_json::to_string(&output)?));
            rounds += 1;
        }
    }
}

fn final_content(response: LlmGatewayResponse) -> Result<String> {
    match response.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(TabijiError::GatewayError("completion returned no content".to_string())),
    }
}
