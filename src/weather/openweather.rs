use crate::error::{Result, TabijiError};
use crate::weather::{WeatherLookup, WeatherRecord, FALLBACK_GEOCODE_QUERY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_GEO_BASE_URL: &str = "http://api.openweathermap.org/geo/1.0";
pub const DEFAULT_DATA_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Connection settings for OpenWeather's geocoding and current-weather APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherConfig {
    pub api_key: String,
    pub geo_base_url: String,
    pub data_base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            geo_base_url: std::env::var("OPENWEATHER_GEO_URL")
                .unwrap_or_else(|_| DEFAULT_GEO_BASE_URL.to_string()),
            data_base_url: std::env::var("OPENWEATHER_DATA_URL")
                .unwrap_or_else(|_| DEFAULT_DATA_BASE_URL.to_string()),
            timeout: None,
        }
    }
}

/// Weather lookup backed by OpenWeather: geocode by name, then current
/// conditions by coordinate, in metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: Client,
    config: OpenWeatherConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct GeoMatch {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

impl OpenWeatherClient {
    pub fn new(config: OpenWeatherConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    /// Single best geocoding match for `query`, `None` when the provider knows no such place.
    async fn geocode(&self, query: &str) -> Result<Option<GeoMatch>> {
        let res = self
            .http
            .get(format!("{}/direct", self.config.geo_base_url))
            .query(&[
                ("q", query),
                ("limit", "1"),
                ("appid", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(TabijiError::ApiError(format!(
                "OpenWeather geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let matches: Vec<GeoMatch> = serde_json::from_str(&body)?;
        Ok(matches.into_iter().next())
    }

    async fn current_conditions(&self, lat: f64, lon: f64) -> Result<OwCurrentResponse> {
        let res = self
            .http
            .get(format!("{}/weather", self.config.data_base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.config.api_key.clone()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(TabijiError::ApiError(format!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn try_lookup(&self, place_name: &str) -> Result<Option<WeatherRecord>> {
        let resolved = match self.geocode(place_name).await? {
            Some(found) => Some(found),
            None => {
                info!(place = place_name, "No geocoding match, retrying with fallback location");
                self.geocode(FALLBACK_GEOCODE_QUERY).await?
            }
        };

        let Some(geo) = resolved else {
            return Ok(None);
        };

        debug!(place = place_name, resolved = %geo.name, lat = geo.lat, lon = geo.lon, "Geocoded");

        let current = self.current_conditions(geo.lat, geo.lon).await?;
        let condition_description = current
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| {
                TabijiError::ApiError(format!("no weather conditions reported for {}", geo.name))
            })?;

        Ok(Some(WeatherRecord {
            queried_name: place_name.to_string(),
            resolved_name: geo.name,
            lat: geo.lat,
            lon: geo.lon,
            temperature: current.main.temp,
            condition_description,
            country: geo.country,
            observed_at: current.dt.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }))
    }
}

#[async_trait]
impl WeatherLookup for OpenWeatherClient {
    async fn lookup(&self, place_name: &str) -> Option<WeatherRecord> {
        if self.config.api_key.is_empty() {
            warn!("OPENWEATHER_API_KEY is not set; weather lookups are disabled");
            return None;
        }

        match self.try_lookup(place_name).await {
            Ok(record) => record,
            Err(e) => {
                warn!(place = place_name, error = %e, "Weather lookup failed");
                None
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
