//! Runtime configuration read from the environment.
//!
//! `.env` files are loaded by the binary before [`AppConfig::from_env`] runs,
//! so everything here is plain environment lookups with defaults.

use crate::error::{Result, TabijiError};
use crate::llm::broker::DEFAULT_MAX_TOOL_ROUNDS;
use crate::llm::gateways::openai::DEFAULT_BASE_URL;
use crate::llm::gateways::OpenAIConfig;
use crate::transcription::DEFAULT_TRANSCRIPTION_MODEL;
use crate::weather::openweather::{DEFAULT_DATA_BASE_URL, DEFAULT_GEO_BASE_URL};
use crate::weather::OpenWeatherConfig;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub llm_timeout: Option<Duration>,
    pub openweather_api_key: Option<String>,
    pub openweather_geo_url: String,
    pub openweather_data_url: String,
    pub bind_addr: String,
    pub max_tool_rounds: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let llm_timeout = get("LLM_TIMEOUT_SECS")
            .map(|v| parse_number::<u64>("LLM_TIMEOUT_SECS", &v).map(Duration::from_secs))
            .transpose()?;

        let max_tool_rounds = get("MAX_TOOL_ROUNDS")
            .map(|v| parse_number::<usize>("MAX_TOOL_ROUNDS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

        Ok(Self {
            llm_api_key: get("GROQ_API_KEY"),
            llm_base_url: or("LLM_BASE_URL", DEFAULT_BASE_URL),
            chat_model: or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            transcription_model: or("TRANSCRIPTION_MODEL", DEFAULT_TRANSCRIPTION_MODEL),
            llm_timeout,
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            openweather_geo_url: or("OPENWEATHER_GEO_URL", DEFAULT_GEO_BASE_URL),
            openweather_data_url: or("OPENWEATHER_DATA_URL", DEFAULT_DATA_BASE_URL),
            bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
            max_tool_rounds,
        })
    }

    /// Gateway settings. The completion credential is required.
    pub fn openai_config(&self) -> Result<OpenAIConfig> {
        let api_key = self.llm_api_key.clone().ok_or_else(|| {
            TabijiError::ConfigError(
                "GROQ_API_KEY is not set. Export it or add it to a .env file.".to_string(),
            )
        })?;

        Ok(OpenAIConfig {
            api_key,
            base_url: self.llm_base_url.trim_end_matches('/').to_string(),
            timeout: self.llm_timeout,
        })
    }

    /// Weather settings. A missing key is allowed; every lookup then reports failure.
    pub fn openweather_config(&self) -> OpenWeatherConfig {
        if self.openweather_api_key.is_none() {
            warn!("OPENWEATHER_API_KEY is not set; weather lookups will be unavailable");
        }

        OpenWeatherConfig {
            api_key: self.openweather_api_key.clone().unwrap_or_default(),
            geo_base_url: self.openweather_geo_url.trim_end_matches('/').to_string(),
            data_base_url: self.openweather_data_url.trim_end_matches('/').to_string(),
            timeout: self.llm_timeout,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        TabijiError::ConfigError(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}
