use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TabijiError;

/// Reply language selected by the traveller.
///
/// On the wire any value other than `"en"` selects Japanese.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "jp")]
    Jp,
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(if value == "en" { Language::En } else { Language::Jp })
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Jp => "jp",
        }
    }

    /// Instruction telling the model which language to answer in.
    pub fn directive(&self) -> &'static str {
        match self {
            Language::En => "Respond ONLY in English.",
            Language::Jp => "Respond ONLY in Japanese (日本語).",
        }
    }

    /// Starter prompts offered on an empty conversation.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Language::En => &[
                "What to wear for climbing Mount Fuji?",
                "Planning a trip to Osaka",
                "Sightseeing in Kyoto outfit?",
            ],
            Language::Jp => &[
                "富士登山には何を着ればいい？",
                "大阪旅行の計画",
                "京都観光の服装は？",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = TabijiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "jp" | "ja" | "japanese" => Ok(Language::Jp),
            _ => Err(TabijiError::InvalidArgument(format!(
                "Unknown language '{s}'. Supported languages: en, jp."
            ))),
        }
    }
}
