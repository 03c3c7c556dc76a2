//! URL construction for the upstream booking platform.

use reqwest::Url;
use teetime_core::SearchRequest;

use crate::error::ScraperError;

const SEARCH_PATH: &str = "tee-times/search";
const API_PATH: &str = "api/tee-times/tee-time-results";
const FACILITY_PATH: &str = "tee-times/facility";

/// Base URL of the upstream platform plus the handful of paths the pipeline
/// touches. Every URL a [`teetime_core::Listing`] carries is produced here.
#[derive(Debug, Clone)]
pub struct UpstreamUrls {
    base: Url,
}

impl UpstreamUrls {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] unless `base` is an absolute
    /// `http` or `https` URL.
    pub fn new(base: &str) -> Result<Self, ScraperError> {
        let invalid = |reason: String| ScraperError::InvalidUrl {
            url: base.to_owned(),
            reason,
        };
        let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self { base: url })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The public search page for `request`, used both to obtain the
    /// anti-forgery token and as the fallback scrape target.
    #[must_use]
    pub fn search_page(&self, request: &SearchRequest) -> Url {
        let mut url = self.join_static(SEARCH_PATH);
        let window = request.time_window();
        url.query_pairs_mut()
            .append_pair("startDate", &request.date().format("%Y-%m-%d").to_string())
            .append_pair("players", &request.players().to_string())
            .append_pair("lat", &request.latitude().to_string())
            .append_pair("lon", &request.longitude().to_string())
            .append_pair("radius", &request.radius_miles().to_string())
            .append_pair("holes", &request.holes().code().to_string())
            .append_pair("timeMin", &window.min.to_string())
            .append_pair("timeMax", &window.max.to_string());
        url
    }

    /// The internal JSON search endpoint.
    #[must_use]
    pub fn api_endpoint(&self) -> Url {
        self.join_static(API_PATH)
    }

    /// Facility detail page, used when a record has no booking link of its own.
    #[must_use]
    pub fn facility_page(&self, slug: &str) -> Option<Url> {
        let slug = slug.trim().trim_matches('/');
        if slug.is_empty() {
            return None;
        }
        self.base.join(&format!("{FACILITY_PATH}/{slug}")).ok()
    }

    /// Resolve an upstream link to an absolute `http(s)` URL.
    ///
    /// Relative paths are resolved against the base, protocol-relative links
    /// take the base's scheme. `javascript:`, `mailto:`
    /// and other schemes yield `None`, as does an empty link.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let url = if let Some(authority) = href.strip_prefix("//") {
            // Protocol-relative: the link names its own host.
            Url::parse(&format!("{}://{authority}", self.base.scheme())).ok()?
        } else {
            match Url::parse(href) {
                Ok(url) => url,
                Err(_) => self.base.join(href.trim_start_matches('/')).ok()?,
            }
        };
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    fn join_static(&self, path: &str) -> Url {
        match self.base.join(path) {
            Ok(url) => url,
            // Static relative paths always join onto an http(s) base.
            Err(_) => self.base.clone(),
        }
    }
}
