//! # tabiji
//!
//! A Japan travel and style concierge. A traveller asks in English or Japanese;
//! the concierge consults live weather through a tool call, answers in prose and
//! optionally tags a place the map should focus on.
//!
//! The pieces, from the inside out:
//!
//! - [`weather`]: geocoding and current conditions behind [`weather::WeatherLookup`]
//! - [`llm`]: gateway, broker and the `get_weather` tool
//! - [`concierge`]: one turn in, one raw reply out, never an error
//! - [`reply`]: splits a raw reply into display text and a map [`reply::Location`]
//! - [`session`]: single-flight conversation state on top of a [`session::Responder`]
//! - [`server`] and [`client`]: the `/api/chat` and `/api/transcribe` HTTP surface
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tabiji::prelude::*;
//!
//! # async fn run() -> tabiji::Result<()> {
//! let gateway = Arc::new(OpenAIGateway::with_config(OpenAIConfig::default())?);
//! let weather = Arc::new(OpenWeatherClient::new(OpenWeatherConfig::default())?);
//! let concierge = Concierge::new(LlmBroker::new("llama-3.3-70b-versatile", gateway), weather);
//!
//! let session = ConversationSession::new(Arc::new(concierge));
//! let reply = session.submit("What should I wear in Kyoto?").await?;
//! println!("{}", reply.text());
//! println!("Map: {}", session.current_location().await.name);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod concierge;
pub mod config;
pub mod error;
pub mod language;
pub mod llm;
pub mod reply;
pub mod server;
pub mod session;
pub mod transcription;
pub mod weather;

pub use error::{Result, TabijiError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::client::ChatClient;
    pub use crate::concierge::Concierge;
    pub use crate::config::AppConfig;
    pub use crate::error::{Result, TabijiError};
    pub use crate::language::Language;
    pub use crate::llm::gateways::{OpenAIConfig, OpenAIGateway};
    pub use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
    pub use crate::llm::{CompletionConfig, LlmBroker, LlmGateway, LlmMessage, MessageRole};
    pub use crate::reply::{parse_reply, Location, ParsedReply};
    pub use crate::session::{ConversationSession, Responder};
    pub use crate::transcription::{AudioUpload, Transcriber, WhisperTranscriber};
    pub use crate::weather::{OpenWeatherClient, OpenWeatherConfig, WeatherLookup, WeatherRecord};
}
