use crate::error::Result;
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const WEATHER_TOOL_NAME: &str = "get_weather";

/// Location used when the model's arguments carry no usable `location`.
pub const DEFAULT_WEATHER_LOCATION: &str = "Tokyo";

pub const WEATHER_UNAVAILABLE: &str = "Weather data unavailable.";

/// Tool exposing current weather for a named place.
///
/// The result handed back to the model is either the serialized
/// [`WeatherRecord`](crate::weather::WeatherRecord) or
/// `{"error": "Weather data unavailable."}`; the tool itself never fails a turn.
#[derive(Clone)]
pub struct GetWeatherTool {
    lookup: Arc<dyn WeatherLookup>,
}

impl GetWeatherTool {
    pub fn new(lookup: Arc<dyn WeatherLookup>) -> Self {
        Self { lookup }
    }

    /// The place to look up, defaulting when the argument is missing, blank or not a string.
    pub fn location_from_args(args: &HashMap<String, Value>) -> String {
        match args.get("location").and_then(|v| v.as_str()).map(str::trim) {
            Some(location) if !location.is_empty() => location.to_string(),
            _ => {
                warn!(?args, "get_weather called without a usable location, using default");
                DEFAULT_WEATHER_LOCATION.to_string()
            }
        }
    }
}

#[async_trait]
impl LlmTool for GetWeatherTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let location = Self::location_from_args(args);
        info!(location = %location, "Looking up weather");

        match self.lookup.lookup(&location).await {
            Some(record) => Ok(serde_json::to_value(record)?),
            None => Ok(json!({ "error": WEATHER_UNAVAILABLE })),
        }
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: WEATHER_TOOL_NAME.to_string(),
                description: "Get current weather for a city in Japan".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "City name (e.g. Tokyo, Kyoto)"
                        }
                    },
                    "required": ["location"]
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherRecord;
    use std::sync::Mutex;

    struct RecordingLookup {
        calls: Mutex<Vec<String>>,
        available: bool,
    }

    impl RecordingLookup {
        fn new(available: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                available,
            })
        }
    }

    #[async_trait]
    impl WeatherLookup for RecordingLookup {
        async fn lookup(&self, place_name: &str) -> Option<WeatherRecord> {
            self.calls.lock().unwrap().push(place_name.to_string());
            self.available.then(|| WeatherRecord {
                queried_name: place_name.to_string(),
                resolved_name: place_name.to_string(),
                lat: 35.0,
                lon: 135.0,
                temperature: 20.0,
                condition_description: "clear sky".to_string(),
                country: None,
                observed_at: None,
            })
        }
    }

    #[test]
    fn test_descriptor() {
        let tool = GetWeatherTool::new(RecordingLookup::new(true));
        let descriptor = tool.descriptor();

        assert_eq!(descriptor.r#type, "function");
        assert_eq!(descriptor.function.name, "get_weather");
        assert_eq!(descriptor.function.parameters["required"][0], "location");
        assert_eq!(descriptor.function.parameters["properties"]["location"]["type"], "string");
        assert!(tool.matches("get_weather"));
    }

    #[tokio::test]
    async fn test_run_returns_record() {
        let lookup = RecordingLookup::new(true);
        let tool = GetWeatherTool::new(lookup.clone());
        let mut args = HashMap::new();
        args.insert("location".to_string(), json!("Kyoto"));

        let result = tool.run(&args).await.unwrap();

        assert_eq!(result["resolved_name"], "Kyoto");
        assert_eq!(result["condition_description"], "clear sky");
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["Kyoto".to_string()]);
    }

    #[tokio::test]
    async fn test_run_reports_unavailable_weather() {
        let tool = GetWeatherTool::new(RecordingLookup::new(false));
        let mut args = HashMap::new();
        args.insert("location".to_string(), json!("Kyoto"));

        let result = tool.run(&args).await.unwrap();

        assert_eq!(result, json!({"error": "Weather data unavailable."}));
    }

    #[tokio::test]
    async fn test_run_defaults_missing_location() {
        let lookup = RecordingLookup::new(true);
        let tool = GetWeatherTool::new(lookup.clone());

        tool.run(&HashMap::new()).await.unwrap();

        assert_eq!(*lookup.calls.lock().unwrap(), vec!["Tokyo".to_string()]);
    }

    #[test]
    fn test_location_from_args_rejects_non_string_and_blank() {
        let mut args = HashMap::new();
        args.insert("location".to_string(), json!(42));
        assert_eq!(GetWeatherTool::location_from_args(&args), "Tokyo");

        args.insert("location".to_string(), json!("   "));
        assert_eq!(GetWeatherTool::location_from_args(&args), "Tokyo");

        args.insert("location".to_string(), json!(" Osaka "));
        assert_eq!(GetWeatherTool::location_from_args(&args), "Osaka");
    }
}
