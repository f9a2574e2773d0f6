//! Conversation state for one traveller.
//!
//! A [`ConversationSession`] owns the user-facing transcript, the current map
//! focus and the reply language. Turns are single-flight: while one
//! [`submit`](ConversationSession::submit) is awaiting its reply, another is
//! refused with [`TabijiError::SessionBusy`] instead of racing on the transcript.

use crate::error::{Result, TabijiError};
use crate::language::Language;
use crate::llm::models::LlmMessage;
use crate::reply::{parse_reply, Location};
use crate::transcription::{AudioUpload, Transcriber};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Produces the raw reply text for one user turn.
///
/// Implementations never fail: provider trouble is reported as prose.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        transcript: &[LlmMessage],
        new_user_text: &str,
        language: Language,
    ) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingReply,
}

#[derive(Debug)]
struct SessionState {
    transcript: Vec<LlmMessage>,
    current_location: Location,
    language: Language,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            transcript: Vec::new(),
            current_location: Location::default(),
            language: Language::default(),
        }
    }
}

pub struct ConversationSession {
    id: Uuid,
    responder: Arc<dyn Responder>,
    transcriber: Option<Arc<dyn Transcriber>>,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self {
            id: Uuid::new_v4(),
            responder,
            transcriber: None,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.state.get_mut().language = language;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a turn is currently awaiting its reply.
    pub fn phase(&self) -> TurnPhase {
        match self.state.try_lock() {
            Ok(_) => TurnPhase::Idle,
            Err(_) => TurnPhase::AwaitingReply,
        }
    }

    /// Send `user_text` and append the assistant's display text to the transcript.
    ///
    /// The map focus moves only when the reply carried a valid location.
    pub async fn submit(&self, user_text: &str) -> Result<LlmMessage> {
        if user_text.trim().is_empty() {
            return Err(TabijiError::InvalidArgument("message cannot be empty".to_string()));
        }

        let mut state = self.state.try_lock().map_err(|_| {
            TabijiError::SessionBusy("a reply is still in flight for this session".to_string())
        })?;

        let prior = state.transcript.clone();
        state.transcript.push(LlmMessage::user(user_text));

        debug!(session = %self.id, turn = prior.len() / 2 + 1, "Submitting turn");
        let raw = self.responder.respond(&prior, user_text, state.language).await;
        let parsed = parse_reply(&raw);

        if let Some(location) = parsed.location {
            info!(session = %self.id, place = %location.name, "Map focus updated");
            state.current_location = location;
        }

        let reply = LlmMessage::assistant(parsed.display_text);
        state.transcript.push(reply.clone());
        Ok(reply)
    }

    /// Transcribe a voice clip and submit it. Silence yields `None` and no turn.
    pub async fn submit_voice(&self, audio: AudioUpload) -> Result<Option<LlmMessage>> {
        let transcriber = self.transcriber.as_ref().ok_or_else(|| {
            TabijiError::ConfigError("voice input needs a transcriber".to_string())
        })?;

        let text = transcriber.transcribe(audio).await?;
        if text.trim().is_empty() {
            debug!(session = %self.id, "Transcription was empty, nothing to submit");
            return Ok(None);
        }

        self.submit(&text).await.map(Some)
    }

    pub async fn transcript(&self) -> Vec<LlmMessage> {
        self.state.lock().await.transcript.clone()
    }

    pub async fn current_location(&self) -> Location {
        self.state.lock().await.current_location.clone()
    }

    pub async fn language(&self) -> Language {
        self.state.lock().await.language
    }

    /// Starter prompts for the current language.
    pub async fn suggestions(&self) -> &'static [&'static str] {
        self.language().await.suggestions()
    }

    pub async fn set_language(&self, language: Language) {
        self.state.lock().await.language = language;
    }

    /// Start a new chat: empty transcript, default map focus. Language is kept.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.transcript.clear();
        state.current_location = Location::default();
    }
}
