//! Separation of model replies into display prose and map data.
//!
//! The model is instructed to end place recommendations with
//!
//! ```text
//! <prose>
//! ___MAP_DATA___
//! { "locations": [{ "name": "Kyoto", "lat": 35.01, "lon": 135.76 }] }
//! ```
//!
//! [`parse_reply`] splits on the delimiter first. Only when the delimiter is
//! absent does it scan for a bare `{...}` span carrying a `locations` array.
//! Parsing never fails: the worst case is that the payload stays in the prose.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

pub const MAP_DATA_DELIMITER: &str = "___MAP_DATA___";

/// Zoom level used when centring a map on a location.
pub const MAP_ZOOM: u8 = 12;

/// A named point the map can focus on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    /// Coordinates are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// OpenStreetMap link centred on this location.
    pub fn map_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map={zoom}/{lat}/{lon}",
            lat = self.lat,
            lon = self.lon,
            zoom = MAP_ZOOM
        )
    }
}

impl Default for Location {
    /// Tokyo, the initial map focus.
    fn default() -> Self {
        Self::new("Tokyo", 35.6762, 139.6503)
    }
}

/// A model reply split into what the user reads and where the map should go.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub display_text: String,
    pub location: Option<Location>,
}

impl ParsedReply {
    fn unchanged(raw: &str) -> Self {
        Self {
            display_text: raw.to_string(),
            location: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapPayload {
    locations: Vec<Value>,
}

impl MapPayload {
    /// First entry, if it is a well-formed location. Later entries are ignored.
    fn first_location(&self) -> Option<Location> {
        let first = self.locations.first()?;
        match Location::deserialize(first) {
            Ok(location) if location.is_valid() => Some(location),
            Ok(location) => {
                debug!(?location, "Discarding location with out-of-range coordinates");
                None
            }
            Err(e) => {
                debug!(error = %e, "Discarding malformed location entry");
                None
            }
        }
    }
}

fn brace_span() -> &'static Regex {
    static BRACE_SPAN: OnceLock<Regex> = OnceLock::new();
    BRACE_SPAN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"))
}

/// Split a raw model reply into display text and an optional map location.
pub fn parse_reply(raw: &str) -> ParsedReply {
    match raw.split_once(MAP_DATA_DELIMITER) {
        Some((prose, payload)) => parse_delimited(prose, payload),
        None => parse_embedded(raw),
    }
}

fn parse_delimited(prose: &str, rest: &str) -> ParsedReply {
    // A repeated delimiter ends the payload; anything after it is ignored.
    let payload = rest.split(MAP_DATA_DELIMITER).next().unwrap_or(rest);
    let location = match serde_json::from_str::<MapPayload>(payload.trim()) {
        Ok(payload) => payload.first_location(),
        Err(e) => {
            debug!(error = %e, "Map data after delimiter is not valid JSON");
            None
        }
    };

    ParsedReply {
        display_text: prose.trim().to_string(),
        location,
    }
}

fn parse_embedded(raw: &str) -> ParsedReply {
    let Some(span) = brace_span().find(raw) else {
        return ParsedReply::unchanged(raw);
    };

    let payload = match serde_json::from_str::<MapPayload>(span.as_str()) {
        Ok(payload) => payload,
        Err(_) => return ParsedReply::unchanged(raw),
    };

    let display_text = format!("{}{}", &raw[..span.start()], &raw[span.end()..])
        .trim()
        .to_string();

    ParsedReply {
        display_text,
        location: payload.first_location(),
    }
}
