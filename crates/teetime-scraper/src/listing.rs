use reqwest::Url;
use teetime_core::{Listing, SourceStrategy, UNKNOWN_HOLES};

/// A listing under construction. Mapping code fills in whatever the upstream
/// record offers; [`ListingDraft::finish`] applies the listing invariants.
#[derive(Debug, Default)]
pub(crate) struct ListingDraft {
    pub course_name: Option<String>,
    pub address: String,
    pub tee_time: Option<String>,
    pub price_display: Option<String>,
    pub holes: Option<String>,
    pub booking_url: Option<Url>,
    pub players: Option<u32>,
    pub image_url: Option<Url>,
}

impl ListingDraft {
    /// `None` when the record has no usable course name or booking URL.
    pub fn finish(self, source_strategy: SourceStrategy) -> Option<Listing> {
        let course_name = self
            .course_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())?;
        let booking_url = self
            .booking_url
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())?;

        Some(Listing {
            course_name,
            address: self.address,
            tee_time: self.tee_time.unwrap_or_default(),
            price_display: self.price_display.unwrap_or_default(),
            holes: self
                .holes
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_HOLES.to_owned()),
            booking_url: booking_url.to_string(),
            source_strategy,
            players: self.players,
            image_url: self.image_url.map(|url| url.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ListingDraft {
        ListingDraft {
            course_name: Some("  Dubsdread Golf Course ".to_owned()),
            booking_url: Url::parse("https://www.golfnow.com/tee-times/facility/1").ok(),
            ..ListingDraft::default()
        }
    }

    #[test]
    fn finish_trims_name_and_defaults_optional_text() {
        let listing = draft().finish(SourceStrategy::Scrape).unwrap();
        assert_eq!(listing.course_name, "Dubsdread Golf Course");
        assert_eq!(listing.holes, UNKNOWN_HOLES);
        assert_eq!(listing.price_display, "");
        assert_eq!(listing.source_strategy, SourceStrategy::Scrape);
    }

    #[test]
    fn finish_drops_records_without_name_or_url() {
        let mut nameless = draft();
        nameless.course_name = Some("   ".to_owned());
        assert!(nameless.finish(SourceStrategy::Api).is_none());

        let mut unlinked = draft();
        unlinked.booking_url = None;
        assert!(unlinked.finish(SourceStrategy::Api).is_none());
    }
}
