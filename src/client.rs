//! HTTP client for a running tabiji server.
//!
//! [`ChatClient`] speaks the `/api/chat` and `/api/transcribe` endpoints, so a
//! [`ConversationSession`](crate::session::ConversationSession) can run against
//! a remote concierge exactly as it would against an in-process one.

use crate::error::{Result, TabijiError};
use crate::language::Language;
use crate::llm::models::{LlmMessage, MessageRole};
use crate::server::{ChatReply, ChatRequest, TranscribeReply};
use crate::session::Responder;
use crate::transcription::{AudioUpload, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Shown in place of a reply when the server cannot be reached.
pub const CLIENT_ERROR_REPLY: &str = "Sorry, I encountered an error.";

pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post one turn to `/api/chat` and return the raw reply text.
    pub async fn chat(
        &self,
        transcript: &[LlmMessage],
        message: &str,
        language: Language,
    ) -> Result<String> {
        let request = ChatRequest {
            message: message.to_string(),
            history: transcript
                .iter()
                .filter(|m| matches!(m.role, MessageRole::User | MessageRole::Assistant))
                .cloned()
                .collect(),
            language: Some(language),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TabijiError::ApiError(format!("chat endpoint returned {status}: {body}")));
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply.reply)
    }
}

#[async_trait]
impl Responder for ChatClient {
    async fn respond(
        &self,
        transcript: &[LlmMessage],
        new_user_text: &str,
        language: Language,
    ) -> String {
        match self.chat(transcript, new_user_text, language).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, server = %self.base_url, "Chat request failed");
                CLIENT_ERROR_REPLY.to_string()
            }
        }
    }
}

#[async_trait]
impl Transcriber for ChatClient {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String> {
        debug!(file = %audio.file_name, bytes = audio.bytes.len(), "Uploading clip for transcription");

        let mut part = Part::bytes(audio.bytes).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type {
            part = part.mime_str(&content_type)?;
        }

        let response = self
            .client
            .post(format!("{}/api/transcribe", self.base_url))
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        let status = response.status();
        let reply: TranscribeReply = response.json().await?;
        match reply {
            TranscribeReply::Text { text } if status.is_success() => Ok(text),
            TranscribeReply::Text { .. } => Err(TabijiError::TranscriptionError(format!(
                "transcribe endpoint returned {status}"
            ))),
            TranscribeReply::Error { error } => Err(TabijiError::TranscriptionError(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn clip() -> AudioUpload {
        AudioUpload {
            file_name: "audio.webm".to_string(),
            content_type: Some("audio/webm".to_string()),
            bytes: b"voice".to_vec(),
        }
    }

    #[test]
    fn test_base_url_loses_trailing_slash() {
        let client = ChatClient::new("http://127.0.0.1:3000/").unwrap();

        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }

    #[tokio::test]
    async fn test_chat_posts_message_history_and_language() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::Json(json!({
                "message": "And Osaka?",
                "history": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello!"}
                ],
                "language": "jp"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"reply":"大阪は晴れです。"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(server.url()).unwrap();
        let transcript = vec![
            LlmMessage::user("Hi"),
            LlmMessage::assistant("Hello!"),
            LlmMessage::system("not forwarded"),
        ];

        let reply = client.respond(&transcript, "And Osaka?", Language::Jp).await;

        assert_eq!(reply, "大阪は晴れです。");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_failure_yields_client_apology() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ChatClient::new(server.url()).unwrap();

        assert!(matches!(
            client.chat(&[], "Hi", Language::En).await,
            Err(TabijiError::ApiError(_))
        ));
        assert_eq!(client.respond(&[], "Hi", Language::En).await, CLIENT_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_malformed_envelope_yields_client_apology() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"answer":"wrong field"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(server.url()).unwrap();

        assert_eq!(client.respond(&[], "Hi", Language::En).await, CLIENT_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_transcribe_returns_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/transcribe")
            .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
            .with_status(200)
            .with_body(r#"{"text":"What to wear in Sapporo?"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(format!("{}/", server.url())).unwrap();

        assert_eq!(client.transcribe(clip()).await.unwrap(), "What to wear in Sapporo?");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transcribe_surfaces_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/transcribe")
            .with_status(500)
            .with_body(r#"{"error":"Transcription failed"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(server.url()).unwrap();
        let err = client.transcribe(clip()).await.unwrap_err();

        assert!(matches!(err, TabijiError::TranscriptionError(ref m) if m == "Transcription failed"));
    }
}
