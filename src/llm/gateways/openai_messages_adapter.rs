//! Adapter for converting LLM messages to and from the OpenAI chat wire format.

use crate::llm::models::{LlmMessage, LlmToolCall, MessageRole};
use crate::llm::tools::parse_tool_arguments;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

/// Adapt LLM messages to OpenAI format.
pub fn adapt_messages_to_openai(messages: &[LlmMessage]) -> Vec<Value> {
    messages.iter().map(adapt_message).collect()
}

fn adapt_message(msg: &LlmMessage) -> Value {
    match msg.role {
        MessageRole::System => json!({ "role": "system", "content": msg.text() }),
        MessageRole::User => json!({ "role": "user", "content": msg.text() }),
        MessageRole::Assistant => {
            let mut assistant_msg = json!({ "role": "assistant" });

            // OpenAI expects an explicit null content alongside tool calls
            assistant_msg["content"] = match &msg.content {
                Some(content) => json!(content),
                None => Value::Null,
            };

            if let Some(ref tool_calls) = msg.tool_calls {
                let formatted_calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id.as_deref().unwrap_or(""),
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": wire_arguments(tc)
                            }
                        })
                    })
                    .collect();
                assistant_msg["tool_calls"] = json!(formatted_calls);
            }

            assistant_msg
        }
        MessageRole::Tool => json!({
            "role": "tool",
            "content": msg.text(),
            "tool_call_id": msg.tool_call_id.as_deref().unwrap_or("")
        }),
    }
}

/// Arguments as the provider originally sent them, or the parsed map re-encoded.
fn wire_arguments(call: &LlmToolCall) -> String {
    match &call.raw_arguments {
        Some(raw) => raw.clone(),
        None => serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".to_string()),
    }
}

/// Convert tool calls from OpenAI format to internal format.
///
/// Calls without a function name are dropped. Argument strings that are not a
/// JSON object are replaced by an empty map so the tool's own defaults apply.
pub fn convert_tool_calls(tool_calls: &[Value]) -> Vec<LlmToolCall> {
    tool_calls
        .iter()
        .filter_map(|tc| {
            let id = tc["id"].as_str().map(String::from);
            let name = tc["function"]["name"].as_str()?.to_string();
            let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");

            let arguments = parse_tool_arguments(args_str).unwrap_or_else(|e| {
                warn!(tool = %name, error = %e, "Malformed tool arguments, substituting defaults");
                HashMap::new()
            });

            Some(LlmToolCall {
                id,
                name,
                arguments,
                raw_arguments: Some(args_str.to_string()),
            })
        })
        .collect()
}
