//! The travel concierge: one user turn in, one raw reply out.
//!
//! [`Concierge`] frames the conversation with the travel system prompt,
//! advertises the `get_weather` tool and lets the [`LlmBroker`] service at most
//! the configured number of tool rounds. Whatever goes wrong with the provider,
//! the caller gets prose back: [`APOLOGY_REPLY`] stands in for the answer.

use crate::error::Result;
use crate::language::Language;
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::{GetWeatherTool, LlmTool};
use crate::llm::LlmBroker;
use crate::reply::MAP_DATA_DELIMITER;
use crate::session::Responder;
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Reply sent in place of a model answer when the provider cannot be reached.
pub const APOLOGY_REPLY: &str = "Sorry, I'm having trouble connecting right now.";

/// System instruction for a turn answered in `language`.
pub fn system_prompt(language: Language) -> String {
    format!(
        "You are a Japan Travel & Style Assistant.\n\
         {directive}\n\
         \n\
         You MUST call the 'get_weather' tool if the user mentions a specific location.\n\
         Answer the user's question naturally.\n\
         \n\
         CRITICAL: If you are recommending a location, you MUST append the coordinates at the very end using this exact format:\n\
         \n\
         {delimiter}\n\
         {{ \"locations\": [{{ \"name\": \"Place Name\", \"lat\": 123.45, \"lon\": 123.45 }}] }}\n\
         \n\
         Do not add Markdown or formatting code blocks around the JSON. Just the separator and the JSON.",
        directive = language.directive(),
        delimiter = MAP_DATA_DELIMITER,
    )
}

pub struct Concierge {
    broker: LlmBroker,
    tools: Vec<Arc<dyn LlmTool>>,
}

impl Concierge {
    pub fn new(broker: LlmBroker, weather: Arc<dyn WeatherLookup>) -> Self {
        let tools: Vec<Arc<dyn LlmTool>> = vec![Arc::new(GetWeatherTool::new(weather))];
        Self { broker, tools }
    }

    /// Assemble the message sequence sent for the first completion.
    ///
    /// Only user-facing turns of the transcript are forwarded; system and tool
    /// messages from earlier turns never reach the provider again.
    pub fn build_messages(
        transcript: &[LlmMessage],
        new_user_text: &str,
        language: Language,
    ) -> Vec<LlmMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 2);
        messages.push(LlmMessage::system(system_prompt(language)));
        messages.extend(
            transcript
                .iter()
                .filter(|m| matches!(m.role, MessageRole::User | MessageRole::Assistant))
                .filter(|m| m.content.is_some())
                .map(|m| LlmMessage {
                    role: m.role,
                    content: m.content.clone(),
                    tool_calls: None,
                    tool_call_id: None,
                }),
        );
        messages.push(LlmMessage::user(new_user_text));
        messages
    }

    /// Run one turn, surfacing provider failures as errors.
    pub async fn try_respond(
        &self,
        transcript: &[LlmMessage],
        new_user_text: &str,
        language: Language,
    ) -> Result<String> {
        let messages = Self::build_messages(transcript, new_user_text, language);
        debug!(history = transcript.len(), %language, "Starting concierge turn");

        self.broker
            .generate(&messages, Some(&self.tools), None)
            .await
    }
}

#[async_trait]
impl Responder for Concierge {
    async fn respond(
        &self,
        transcript: &[LlmMessage],
        new_user_text: &str,
        language: Language,
    ) -> String {
        match self.try_respond(transcript, new_user_text, language).await {
            Ok(reply) => {
                info!(chars = reply.len(), "Concierge reply ready");
                reply
            }
            Err(e) => {
                error!(error = %e, model = self.broker.model(), "Concierge turn failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}
