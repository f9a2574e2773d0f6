//! Weather lookup for places the traveller mentions.
//!
//! [`WeatherLookup`] is the seam the `get_weather` tool calls through. A lookup
//! never fails loudly: `None` means "no weather context available" and the
//! conversation carries on without it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod openweather;

pub use openweather::{OpenWeatherClient, OpenWeatherConfig};

/// Geocoding query used when the requested place cannot be resolved.
pub const FALLBACK_GEOCODE_QUERY: &str = "Tokyo,JP";

/// Current conditions for a resolved place.
///
/// `queried_name` is what the model asked for, `resolved_name` is what the
/// provider matched; they differ for typos, fallbacks and ambiguous names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub queried_name: String,
    pub resolved_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub condition_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait WeatherLookup: Send + Sync {
    /// Resolve `place_name` and fetch its current conditions. `None` signals failure.
    async fn lookup(&self, place_name: &str) -> Option<WeatherRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_record_serialization_skips_missing_optionals() {
        let record = WeatherRecord {
            queried_name: "Kyoto".to_string(),
            resolved_name: "Kyoto".to_string(),
            lat: 35.0116,
            lon: 135.7681,
            temperature: 12.5,
            condition_description: "light rain".to_string(),
            country: None,
            observed_at: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["queried_name"], "Kyoto");
        assert_eq!(json["condition_description"], "light rain");
        assert!(json.get("country").is_none());
        assert!(json.get("observed_at").is_none());
    }
}
