//! OpenAI-compatible gateway for LLM interactions.
//!
//! Speaks the `/chat/completions` and `/audio/transcriptions` endpoints shared by
//! OpenAI and compatible hosts such as Groq, which is the default host here.

use crate::error::{Result, TabijiError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::openai_messages_adapter::{adapt_messages_to_openai, convert_tool_calls};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::LlmTool;
use crate::transcription::AudioUpload;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for connecting to an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GROQ_API_KEY").unwrap_or_default(),
            base_url: std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: None,
        }
    }
}

/// Gateway for OpenAI-compatible LLM services.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAIGateway {
    /// Create a new gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(Self {
            client: client_builder.build()?,
            config,
        })
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(OpenAIConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: None,
        })
    }

    /// Transcribe an audio clip with the given speech-to-text model.
    pub async fn transcribe(&self, model: &str, audio: AudioUpload) -> Result<String> {
        info!(model = model, bytes = audio.bytes.len(), "Delegating transcription");

        let mut part = Part::bytes(audio.bytes).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type {
            part = part.mime_str(&content_type)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TabijiError::TranscriptionError(format!(
                "transcription API error: {} - {}",
                status, error_text
            )));
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Arc<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to OpenAI-compatible API for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let mut body = serde_json::json!({
            "model": model,
            "messages": adapt_messages_to_openai(messages),
            "temperature": config.temperature,
        });

        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(tools) = tools {
            let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
            body["tools"] = serde_json::to_value(tool_defs)?;
            body["tool_choice"] = serde_json::json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TabijiError::GatewayError(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;
        let message = &response_body["choices"][0]["message"];
        if message.is_null() {
            return Err(TabijiError::GatewayError("response contained no choices".to_string()));
        }

        let content = message["content"].as_str().map(String::from);
        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| convert_tool_calls(calls))
            .unwrap_or_default();

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::{FunctionDescriptor, ToolDescriptor};
    use mockito::{Matcher, Server};
    use std::collections::HashMap;

    struct MockTool;

    #[async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(serde_json::json!({}))
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                r#type: "function".to_string(),
                function: FunctionDescriptor {
                    name: "get_weather".to_string(),
                    description: "Weather".to_string(),
                    parameters: serde_json::json!({}),
                },
            }
        }
    }

    fn gateway_for(server: &Server) -> OpenAIGateway {
        OpenAIGateway::with_api_key_and_base_url("test-key", server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_complete_simple() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"llama","messages":[{"role":"user","content":"Hi"}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#)
            .create_async()
            .await;

        let result = gateway_for(&server)
            .complete("llama", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.content.as_deref(), Some("Hello!"));
        assert!(result.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_complete_advertises_tools_and_parses_tool_calls() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJsonString(
                r#"{"tool_choice":"auto","tools":[{"type":"function","function":{"name":"get_weather","description":"Weather","parameters":{}}}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[
                    {"id":"call_9","type":"function","function":{"name":"get_weather","arguments":"{\"location\":\"Kyoto\"}"}}
                ]}}]}"#,
            )
            .create_async()
            .await;

        let tools: Vec<Arc<dyn LlmTool>> = vec![Arc::new(MockTool)];
        let result = gateway_for(&server)
            .complete("llama", &[LlmMessage::user("Kyoto?")], Some(&tools), &CompletionConfig::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.content.is_none());
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(result.tool_calls[0].arguments["location"], serde_json::json!("Kyoto"));
    }

    #[tokio::test]
    async fn test_complete_with_malformed_tool_arguments_keeps_call() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"tool_calls":[
                    {"id":"call_1","function":{"name":"get_weather","arguments":"Kyoto please"}}
                ]}}]}"#,
            )
            .create_async()
            .await;

        let result = gateway_for(&server)
            .complete("llama", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.tool_calls[0].arguments.is_empty());
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let result = gateway_for(&server)
            .complete("llama", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("429"));
        assert!(err.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let result = gateway_for(&server)
            .complete("llama", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .await;

        assert!(matches!(result, Err(TabijiError::GatewayError(_))));
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Regex("whisper-large-v3".to_string()))
            .with_status(200)
            .with_body(r#"{"text":"What should I wear in Kyoto?"}"#)
            .create_async()
            .await;

        let audio = AudioUpload {
            file_name: "audio.webm".to_string(),
            content_type: Some("audio/webm".to_string()),
            bytes: vec![1, 2, 3],
        };
        let text = gateway_for(&server).transcribe("whisper-large-v3", audio).await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "What should I wear in Kyoto?");
    }

    #[tokio::test]
    async fn test_transcribe_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/audio/transcriptions")
            .with_status(500)
            .create_async()
            .await;

        let audio = AudioUpload {
            file_name: "audio.webm".to_string(),
            content_type: None,
            bytes: vec![0],
        };
        let result = gateway_for(&server).transcribe("whisper-large-v3", audio).await;

        assert!(matches!(result, Err(TabijiError::TranscriptionError(_))));
    }
}
