//! Travel text extraction: prompt construction and response normalization
//!
//! The model is asked for `{"city": ..., "items": [...]}` but older prompts
//! produced a bare array or a single item object, and those shapes are still
//! accepted. Every item is normalized to the full field set before it leaves
//! this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::city::{infer_city, UNKNOWN_LOCATION};

pub const TRIP_SYSTEM_PROMPT: &str = "You are a travel information extraction AI. \
Extract structured location data from travel guides, itineraries, or travel notes. \
Always return valid JSON objects with the exact structure specified. \
Parse dates in MM-DD format when possible. \
Identify the main city or destination name from the text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelCategory {
    Attraction,
    Restaurant,
    Hotel,
    Activity,
    Event,
    #[default]
    Other,
}

impl TravelCategory {
    /// Case-insensitive match; anything unrecognized is `Other`
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "attraction" => TravelCategory::Attraction,
            "restaurant" => TravelCategory::Restaurant,
            "hotel" => TravelCategory::Hotel,
            "activity" => TravelCategory::Activity,
            "event" => TravelCategory::Event,
            _ => TravelCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTravelItem {
    pub title: String,
    pub date_range: DateRange,
    pub location: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub category: TravelCategory,
}

impl Default for ExtractedTravelItem {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            date_range: DateRange::default(),
            location: UNKNOWN_LOCATION.to_string(),
            description: String::new(),
            highlights: Vec::new(),
            category: TravelCategory::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelExtractionResult {
    pub city: Option<String>,
    pub items: Vec<ExtractedTravelItem>,
}

#[derive(Debug, Error)]
pub enum TravelParseError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Expected a JSON object or array, got {0}")]
    UnexpectedShape(&'static str),
}

pub fn build_trip_prompt(text: &str) -> String {
    format!(
        r#"
Analyze the following travel text and extract structured information about locations, dates, and activities.
Return ONLY a valid JSON object with this exact structure:
{{
  "city": "string | null",
  "items": [
    {{
      "title": "string",
      "dateRange": {{ "start": "string", "end": "string | null" }},
      "location": "string",
      "description": "string",
      "highlights": ["string"],
      "category": "string"
    }}
  ]
}}

Extract the main city or destination name from the text. If a city is mentioned, set "city" to that city name. If no clear city is mentioned, set "city" to null.
Extract all locations mentioned in the text. If dates are mentioned, parse them. If no dates are found, use null for end date.
Categories should be one of: "attraction", "restaurant", "hotel", "activity", "event", "other"

Travel text:
{text}

Return ONLY the JSON object, no other text.
"#
    )
}

/// Remove Markdown code fences the model likes to wrap JSON in
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

// Outermost {...} or [...] of a reply that has prose around the JSON
fn embedded_json_slice(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Keys that mark an object as an extraction result or a travel item
const EXTRACTION_KEYS: [&str; 8] = [
    "items",
    "city",
    "title",
    "location",
    "description",
    "dateRange",
    "highlights",
    "category",
];

// An embedded fragment only counts when it carries extraction data;
// a stray `[]` or `{}` inside a refusal does not
fn looks_like_extraction(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(object) => EXTRACTION_KEYS.iter().any(|key| object.contains_key(*key)),
        _ => false,
    }
}

fn parse_json_payload(cleaned: &str) -> Result<Value, TravelParseError> {
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => Ok(value),
        Err(err) => embedded_json_slice(cleaned)
            .and_then(|slice| serde_json::from_str::<Value>(slice).ok())
            .filter(looks_like_extraction)
            .ok_or_else(|| TravelParseError::InvalidJson(err.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Fill every missing field of one raw item with its default
pub fn normalize_item(raw: &Value) -> ExtractedTravelItem {
    let defaults = ExtractedTravelItem::default();
    let date_range = raw.get("dateRange");

    ExtractedTravelItem {
        title: non_empty_str(raw.get("title"))
            .map(str::to_string)
            .unwrap_or(defaults.title),
        date_range: DateRange {
            start: non_empty_str(date_range.and_then(|d| d.get("start"))).map(str::to_string),
            end: non_empty_str(date_range.and_then(|d| d.get("end"))).map(str::to_string),
        },
        location: non_empty_str(raw.get("location"))
            .map(str::to_string)
            .unwrap_or(defaults.location),
        description: non_empty_str(raw.get("description"))
            .map(str::to_string)
            .unwrap_or(defaults.description),
        highlights: raw
            .get("highlights")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.highlights),
        category: non_empty_str(raw.get("category"))
            .map(TravelCategory::parse_lenient)
            .unwrap_or(defaults.category),
    }
}

/// Parse a raw model reply into a normalized extraction result.
///
/// `source_text` is the user's original text, used for city inference when
/// the model did not name one.
pub fn parse_travel_response(
    raw: &str,
    source_text: &str,
) -> Result<TravelExtractionResult, TravelParseError> {
    let cleaned = strip_code_fences(raw);
    let parsed = parse_json_payload(&cleaned)?;

    let (raw_items, city) = match parsed {
        Value::Array(items) => (items, None),
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => {
                let city = non_empty_str(object.get("city")).map(str::to_string);
                (items, city)
            }
            Some(other) => {
                // not the {city, items} shape; the whole object is one item
                object.insert("items".to_string(), other);
                (vec![Value::Object(object)], None)
            }
            None => (vec![Value::Object(object)], None),
        },
        other => return Err(TravelParseError::UnexpectedShape(json_kind(&other))),
    };

    let items: Vec<ExtractedTravelItem> = raw_items.iter().map(normalize_item).collect();
    let city = city.or_else(|| infer_city(items.iter().map(|item| item.location.as_str()), source_text));

    Ok(TravelExtractionResult { city, items })
}
