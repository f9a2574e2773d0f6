//! Speech-to-text for voice input.

use crate::error::Result;
use crate::llm::gateways::OpenAIGateway;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3";

/// A recorded audio clip awaiting transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    /// Read a clip from disk, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.webm")
            .to_string();
        let content_type = audio_content_type(&file_name).map(String::from);

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

fn audio_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    match ext.as_str() {
        "webm" => Some("audio/webm"),
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String>;
}

/// Whisper transcription through an OpenAI-compatible gateway.
pub struct WhisperTranscriber {
    gateway: Arc<OpenAIGateway>,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(gateway: Arc<OpenAIGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String> {
        self.gateway.transcribe(&self.model, audio).await
    }
}
