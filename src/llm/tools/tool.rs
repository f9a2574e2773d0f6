use crate::error::{Result, TabijiError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Descriptor for tool function parameters
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Trait for LLM tools
///
/// Tools run inside an in-flight completion round, so `run` is async and may
/// perform outbound requests of its own.
#[async_trait]
pub trait LlmTool: Send + Sync {
    /// Execute the tool with given arguments
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value>;

    /// Get tool descriptor for LLM
    fn descriptor(&self) -> ToolDescriptor;

    /// Check if this tool matches the given name
    fn matches(&self, name: &str) -> bool {
        self.descriptor().function.name == name
    }
}

/// Parse the JSON-encoded argument string of a tool call.
///
/// Arguments come from model output and are untrusted: anything other than a
/// JSON object is rejected.
pub fn parse_tool_arguments(raw: &str) -> Result<HashMap<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(TabijiError::InvalidArgument(format!(
            "tool arguments must be a JSON object, got {}",
            other
        ))),
    }
}
