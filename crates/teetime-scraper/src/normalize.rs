//! Normalization from upstream API payloads to [`teetime_core::Listing`].
//!
//! Shape detection is purely structural and runs in a fixed order: facility
//! summaries (a), wrapped PascalCase facilities (b), then flat tee-time rows
//! (c). The first shape whose discriminating keys all check out is used for
//! the whole payload. Individual records that still cannot produce a valid
//! listing are dropped, never reported.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use teetime_core::{Listing, SourceStrategy};

use crate::error::ScraperError;
use crate::listing::ListingDraft;
use crate::types::{
    compose_address, first_label, label, players, FacilitySummary, FlatTeeTime,
    RawUpstreamResponse, SummaryTeeTime, WrappedFacility, WrappedTeeTime,
};
use crate::urls::UpstreamUrls;

/// Where facility arrays have been observed, in lookup order.
const FACILITY_POINTERS: &[&str] = &[
    "/ttResults/facilities",
    "/ttResults/Facilities",
    "/facilities",
    "/Facilities",
    "/Results",
];

/// Where flat tee-time rows have been observed, in lookup order.
const ROW_POINTERS: &[&str] = &["/teeTimes", "/ttResults/teeTimes"];

const SUMMARY_NESTED_KEYS: &[&str] = &["teeTimes", "hotDeals", "promotedCampaignTeeTimes"];

/// The upstream layout recognised in a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseShape<'a> {
    /// Facility summaries with nested `teeTimes` / `hotDeals` /
    /// `promotedCampaignTeeTimes` arrays.
    FacilitySummaries(&'a [Value]),
    /// `{ Facility: {..}, TeeTimes: [..] }` records.
    WrappedFacilities(&'a [Value]),
    /// Rows already shaped like tee times.
    FlatTeeTimes(&'a [Value]),
    Unrecognized,
}

/// Classify a JSON payload without mapping any records.
#[must_use]
pub fn detect_shape(json: &Value) -> ResponseShape<'_> {
    let facility_lists: Vec<&[Value]> = FACILITY_POINTERS
        .iter()
        .filter_map(|p| json.pointer(p).and_then(Value::as_array))
        .chain(json.as_array())
        .map(Vec::as_slice)
        .collect();

    if let Some(items) = facility_lists.iter().copied().find(|items| is_summary_list(items)) {
        return ResponseShape::FacilitySummaries(items);
    }
    if let Some(items) = facility_lists.iter().copied().find(|items| is_wrapped_list(items)) {
        return ResponseShape::WrappedFacilities(items);
    }

    let row_lists = ROW_POINTERS
        .iter()
        .filter_map(|p| json.pointer(p).and_then(Value::as_array))
        .chain(json.as_array())
        .map(Vec::as_slice);
    for rows in row_lists {
        if is_flat_list(rows) {
            return ResponseShape::FlatTeeTimes(rows);
        }
    }

    ResponseShape::Unrecognized
}

/// Map an API response to listings tagged [`SourceStrategy::Api`].
///
/// An empty result is a success.
///
/// # Errors
///
/// Returns [`ScraperError::Parse`] for HTML bodies and for JSON that matches
/// none of the known shapes.
pub fn normalize_response(
    raw: &RawUpstreamResponse,
    urls: &UpstreamUrls,
) -> Result<Vec<Listing>, ScraperError> {
    let json = match raw {
        RawUpstreamResponse::Json(json) => json,
        RawUpstreamResponse::Html(_) => {
            return Err(ScraperError::Parse {
                reason: "expected JSON, received an HTML document".to_owned(),
            })
        }
    };

    let (shape_name, drafts): (&str, Vec<Option<ListingDraft>>) = match detect_shape(json) {
        ResponseShape::FacilitySummaries(items) => (
            "facility_summaries",
            items.iter().flat_map(|f| map_summary(f, urls)).collect(),
        ),
        ResponseShape::WrappedFacilities(items) => (
            "wrapped_facilities",
            items.iter().flat_map(|f| map_wrapped(f, urls)).collect(),
        ),
        ResponseShape::FlatTeeTimes(rows) => (
            "flat_tee_times",
            rows.iter().map(|row| map_flat(row, urls)).collect(),
        ),
        ResponseShape::Unrecognized => {
            return Err(ScraperError::Parse {
                reason: describe_unrecognized(json),
            })
        }
    };

    let total = drafts.len();
    let listings: Vec<Listing> = drafts
        .into_iter()
        .flatten()
        .filter_map(|draft| draft.finish(SourceStrategy::Api))
        .collect();

    let dropped = total - listings.len();
    if dropped > 0 {
        tracing::debug!(shape = shape_name, dropped, "dropped records failing listing invariants");
    }
    tracing::debug!(shape = shape_name, count = listings.len(), "normalized API response");
    Ok(listings)
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

fn is_summary_list(items: &[Value]) -> bool {
    items.iter().all(|item| {
        let Some(obj) = item.as_object() else {
            return false;
        };
        let name_ok = matches!(obj.get("name"), Some(Value::String(_) | Value::Null));
        let nested_ok = SUMMARY_NESTED_KEYS
            .iter()
            .all(|k| matches!(obj.get(*k), None | Some(Value::Null | Value::Array(_))));
        name_ok && nested_ok
    })
}

fn is_wrapped_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            matches!(item.get("Facility"), Some(Value::Object(_)))
                && matches!(item.get("TeeTimes"), None | Some(Value::Null | Value::Array(_)))
        })
}

fn is_flat_list(rows: &[Value]) -> bool {
    rows.iter().all(|row| {
        row.is_object()
            && matches!(row.get("teeTime"), Some(Value::String(_) | Value::Number(_)))
            && matches!(row.get("facility"), None | Some(Value::Null | Value::Object(_)))
    })
}

fn describe_unrecognized(json: &Value) -> String {
    match json {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(10).collect();
            format!("no known shape matched; top-level keys: [{}]", keys.join(", "))
        }
        Value::Array(items) => format!(
            "no known shape matched an array of {} element(s)",
            items.len()
        ),
        Value::Null => "response body was null".to_owned(),
        _ => "response body was a bare scalar".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

fn map_summary(value: &Value, urls: &UpstreamUrls) -> Vec<Option<ListingDraft>> {
    let Ok(facility) = FacilitySummary::deserialize(value) else {
        return vec![None];
    };
    let address = compose_address(facility.address.as_ref());
    let slug_page = facility
        .seo_friendly_name
        .as_deref()
        .and_then(|slug| urls.facility_page(slug));
    let image_url = facility
        .thumbnail_image_path
        .as_deref()
        .and_then(|path| urls.resolve(path));

    let Some(nested) = facility.nested_tee_times() else {
        return vec![Some(ListingDraft {
            course_name: facility.name.clone(),
            address,
            tee_time: Some(span(
                facility.min_date_formatted.as_ref(),
                facility.max_date_formatted.as_ref(),
            )),
            price_display: Some(span(
                facility.min_price_formatted.as_ref(),
                facility.max_price_formatted.as_ref(),
            )),
            holes: None,
            booking_url: slug_page,
            players: None,
            image_url,
        })];
    };

    nested
        .iter()
        .map(|raw| {
            let tee_time: SummaryTeeTime = decode(raw)?;
            let booking_url = tee_time
                .tee_time_booking_url
                .as_deref()
                .and_then(|href| urls.resolve(href))
                .or_else(|| slug_page.clone());
            Some(ListingDraft {
                course_name: facility.name.clone(),
                address: address.clone(),
                tee_time: first_label([
                    tee_time.tee_time.as_ref(),
                    tee_time.formatted_time.as_ref(),
                    facility.min_date_formatted.as_ref(),
                ]),
                price_display: first_label([
                    tee_time.display_amount.as_ref(),
                    tee_time.rate.as_ref(),
                    facility.min_price_formatted.as_ref(),
                ]),
                holes: first_label([tee_time.holes.as_ref(), tee_time.hole_count.as_ref()]),
                booking_url,
                players: players(tee_time.players.as_ref()),
                image_url: image_url.clone(),
            })
        })
        .collect()
}

fn map_wrapped(value: &Value, urls: &UpstreamUrls) -> Vec<Option<ListingDraft>> {
    let Ok(wrapped) = WrappedFacility::deserialize(value) else {
        return vec![None];
    };
    let booking_url = wrapped
        .facility
        .booking_url
        .as_deref()
        .and_then(|href| urls.resolve(href));
    let address = compose_address(wrapped.facility.address.as_ref());
    let tee_times = wrapped.tee_times.unwrap_or_default();

    tee_times
        .iter()
        .map(|raw| {
            let tee_time: WrappedTeeTime = decode(raw)?;
            Some(ListingDraft {
                course_name: wrapped.facility.name.clone(),
                address: address.clone(),
                tee_time: tee_time.display_time.as_ref().and_then(label),
                price_display: tee_time.rate.as_ref().and_then(label),
                holes: tee_time.hole_count.as_ref().and_then(label),
                booking_url: booking_url.clone(),
                players: players(tee_time.player_count.as_ref()),
                image_url: None,
            })
        })
        .collect()
}

fn map_flat(value: &Value, urls: &UpstreamUrls) -> Option<ListingDraft> {
    let row = FlatTeeTime::deserialize(value).ok()?;
    let facility = row.facility.unwrap_or_default();
    let booking_url = row
        .tee_time_booking_url
        .as_deref()
        .and_then(|href| urls.resolve(href))
        .or_else(|| {
            facility
                .seo_friendly_name
                .as_deref()
                .and_then(|slug| urls.facility_page(slug))
        });
    Some(ListingDraft {
        course_name: facility.name,
        address: compose_address(facility.address.as_ref()),
        tee_time: row.tee_time.as_ref().and_then(label),
        price_display: row.display_amount.as_ref().and_then(label),
        holes: row.hole_count.as_ref().and_then(label),
        booking_url,
        players: players(row.number_of_players.as_ref()),
        image_url: None,
    })
}

/// `"min – max"`, collapsing to one side when the other is missing or equal.
fn span(min: Option<&Value>, max: Option<&Value>) -> String {
    match (min.and_then(label), max.and_then(label)) {
        (Some(a), Some(b)) if a == b => a,
        (Some(a), Some(b)) => format!("{a} \u{2013} {b}"),
        (Some(one), None) | (None, Some(one)) => one,
        (None, None) => String::new(),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
