//! Serde models for the upstream tee-time payloads.
//!
//! The platform has returned at least three unrelated layouts for the same
//! search. Fields other than the ones used to tell the layouts apart are
//! kept as raw [`Value`]s and read through [`label`], since their types drift
//! between deployments (prices arrive as strings, numbers or rate objects).

use serde::Deserialize;
use serde_json::Value;

/// Body returned by the API endpoint, before shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum RawUpstreamResponse {
    Json(Value),
    /// Non-JSON body, typically a bot-wall or login page.
    Html(String),
}

// ---------------------------------------------------------------------------
// Shape (a): facility summaries with nested tee-time arrays
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FacilitySummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub seo_friendly_name: Option<String>,
    #[serde(default)]
    pub thumbnail_image_path: Option<String>,
    #[serde(default)]
    pub min_date_formatted: Option<Value>,
    #[serde(default)]
    pub max_date_formatted: Option<Value>,
    #[serde(default)]
    pub min_price_formatted: Option<Value>,
    #[serde(default)]
    pub max_price_formatted: Option<Value>,
    #[serde(default)]
    pub tee_times: Option<Vec<Value>>,
    #[serde(default)]
    pub hot_deals: Option<Vec<Value>>,
    #[serde(default)]
    pub promoted_campaign_tee_times: Option<Vec<Value>>,
}

impl FacilitySummary {
    /// First non-empty nested tee-time array, in the platform's priority
    /// order.
    pub fn nested_tee_times(&self) -> Option<&[Value]> {
        [&self.tee_times, &self.hot_deals, &self.promoted_campaign_tee_times]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|items| !items.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryTeeTime {
    #[serde(default)]
    pub tee_time: Option<Value>,
    #[serde(default)]
    pub formatted_time: Option<Value>,
    #[serde(default)]
    pub display_amount: Option<Value>,
    #[serde(default)]
    pub rate: Option<Value>,
    #[serde(default)]
    pub holes: Option<Value>,
    #[serde(default)]
    pub hole_count: Option<Value>,
    #[serde(default)]
    pub players: Option<Value>,
    #[serde(default)]
    pub tee_time_booking_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Shape (b): PascalCase facilities under a result wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WrappedFacility {
    pub facility: FacilityHeader,
    #[serde(default)]
    pub tee_times: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FacilityHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub address: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WrappedTeeTime {
    #[serde(default)]
    pub display_time: Option<Value>,
    #[serde(default)]
    pub rate: Option<Value>,
    #[serde(default)]
    pub hole_count: Option<Value>,
    #[serde(default)]
    pub player_count: Option<Value>,
}

// ---------------------------------------------------------------------------
// Shape (c): flat tee-time rows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlatTeeTime {
    #[serde(default)]
    pub facility: Option<FlatFacility>,
    #[serde(default)]
    pub tee_time: Option<Value>,
    #[serde(default)]
    pub display_amount: Option<Value>,
    #[serde(default)]
    pub hole_count: Option<Value>,
    #[serde(default)]
    pub number_of_players: Option<Value>,
    #[serde(default)]
    pub tee_time_booking_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlatFacility {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub seo_friendly_name: Option<String>,
}

/// Render a loosely typed upstream field as display text.
///
/// Strings are trimmed, numbers printed as-is, and rate objects unwrapped via
/// their `displayAmount`. Blank strings, `null`, booleans and arrays yield
/// `None`.
pub(crate) fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("displayAmount")
            .or_else(|| map.get("DisplayAmount"))
            .and_then(label),
        _ => None,
    }
}

/// First field in `candidates` that renders to a label.
pub(crate) fn first_label<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> Option<String> {
    candidates.into_iter().flatten().find_map(label)
}

/// Best-effort `"line1, city, state"` from an address object or string.
pub(crate) fn compose_address(address: Option<&Value>) -> String {
    match address {
        Some(Value::Object(map)) => {
            let part = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(label));
            [
                part(&["line1", "Line1"]),
                part(&["city", "City"]),
                part(&["stateProvinceCode", "StateProvinceCode"]),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
        }
        Some(other) => label(other).unwrap_or_default(),
        None => String::new(),
    }
}

/// Player count from a numeric or numeric-string field.
pub(crate) fn players(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
