use serde::{Deserialize, Serialize};

/// Label used for `holes` when the upstream does not say.
pub const UNKNOWN_HOLES: &str = "N/A";

/// Which acquisition path produced a [`Listing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStrategy {
    Api,
    Scrape,
}

impl std::fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStrategy::Api => write!(f, "api"),
            SourceStrategy::Scrape => write!(f, "scrape"),
        }
    }
}

/// One bookable tee-time offering, independent of the upstream shape that
/// produced it.
///
/// Upstream strings (`tee_time`, `price_display`, `holes`) are carried
/// verbatim; the platform formats them inconsistently and reparsing loses
/// information. `course_name` is never empty and `booking_url` is always an
/// absolute URL: constructors in the scraper crate drop records that would
/// violate either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub course_name: String,
    /// Best-effort `"line1, city, state"`; may be empty.
    pub address: String,
    pub tee_time: String,
    pub price_display: String,
    /// Hole count label, e.g. `"18"`, or [`UNKNOWN_HOLES`].
    pub holes: String,
    pub booking_url: String,
    pub source_strategy: SourceStrategy,
    /// Player count the upstream quoted this row for, when it says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<u32>,
    /// Facility thumbnail, when the upstream provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Listing {
        Listing {
            course_name: "Dubsdread Golf Course".to_owned(),
            address: "549 W Par St, Orlando, FL".to_owned(),
            tee_time: "7:10 AM".to_owned(),
            price_display: "$45.00".to_owned(),
            holes: "18".to_owned(),
            booking_url: "https://www.golfnow.com/tee-times/facility/1/tee-time/2".to_owned(),
            source_strategy: SourceStrategy::Api,
            players: None,
            image_url: None,
        }
    }

    #[test]
    fn serializes_with_camel_case_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["courseName"], "Dubsdread Golf Course");
        assert_eq!(json["priceDisplay"], "$45.00");
        assert_eq!(json["bookingUrl"], "https://www.golfnow.com/tee-times/facility/1/tee-time/2");
        assert_eq!(json["sourceStrategy"], "api");
    }

    #[test]
    fn omits_absent_optional_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("players").is_none());
        assert!(json.get("imageUrl").is_none());
    }

    #[test]
    fn scrape_strategy_serializes_lowercase() {
        let mut listing = sample();
        listing.source_strategy = SourceStrategy::Scrape;
        let json = serde_json::to_string(&listing).unwrap();
        assert!(json.contains("\"sourceStrategy\":\"scrape\""));
        assert_eq!(SourceStrategy::Scrape.to_string(), "scrape");
    }
}
