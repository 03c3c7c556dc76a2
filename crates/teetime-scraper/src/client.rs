use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::Client;
use serde::Serialize;
use teetime_core::SearchRequest;

use crate::error::ScraperError;
use crate::session::Session;
use crate::types::RawUpstreamResponse;
use crate::urls::UpstreamUrls;

/// Header names must be lowercase for `HeaderMap`; HTTP treats them
/// case-insensitively.
const TOKEN_HEADER: &str = "__requestverificationtoken";
const API_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const API_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Results per API page. Only the first page is requested.
const PAGE_SIZE: u32 = 30;
const MAX_PRICE: u32 = 10_000;
/// Tee times listed per facility in the summary view.
const TEE_TIMES_PER_FACILITY: u32 = 15;

/// HTTP client for the platform's internal tee-time search endpoint.
///
/// Sends the browser-shaped JSON body together with the anti-forgery token
/// of a freshly acquired [`Session`]. Non-2xx statuses surface as
/// [`ScraperError::Http`]; response bodies are not interpreted here beyond
/// "JSON or not", see [`crate::normalize`].
pub struct ApiClient {
    client: Client,
    urls: UpstreamUrls,
    accept_language: String,
}

impl ApiClient {
    /// Creates an `ApiClient` with the given per-request timeout and
    /// `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Network`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        urls: UpstreamUrls,
        timeout: Duration,
        user_agent: &str,
        accept_language: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            urls,
            accept_language: accept_language.to_owned(),
        })
    }

    /// POST one search to the API endpoint.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] for any non-2xx status.
    /// - [`ScraperError::Network`] on connection failure or timeout.
    pub async fn search(
        &self,
        session: &Session,
        request: &SearchRequest,
    ) -> Result<RawUpstreamResponse, ScraperError> {
        let url = self.urls.api_endpoint();
        let body = search_body(request, Utc::now());

        let response = self
            .client
            .post(url.clone())
            .headers(self.headers(session)?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "tee-time API returned non-success status");
            return Err(ScraperError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        Ok(match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => RawUpstreamResponse::Json(value),
            Err(_) => RawUpstreamResponse::Html(text),
        })
    }

    fn headers(&self, session: &Session) -> Result<HeaderMap, ScraperError> {
        let invalid = |name: &str| ScraperError::Parse {
            reason: format!("{name} is not a valid header value"),
        };
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(API_CONTENT_TYPE));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.accept_language).map_err(|_| invalid("Accept-Language"))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(session.source_url()).map_err(|_| invalid("Referer"))?,
        );
        let mut token =
            HeaderValue::from_str(session.token()).map_err(|_| invalid("anti-forgery token"))?;
        token.set_sensitive(true);
        headers.insert(TOKEN_HEADER, token);
        Ok(headers)
    }
}

/// JSON body the platform's own web app posts to the search endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchBody {
    radius: u32,
    latitude: String,
    longitude: String,
    page_size: u32,
    page_number: u32,
    search_type: u8,
    sort_by: &'static str,
    sort_direction: u8,
    date: String,
    price_min: u32,
    price_max: u32,
    players: u32,
    holes: u8,
    facility_type: u8,
    rate_type: &'static str,
    time_min: u8,
    time_max: u8,
    sort_by_rollup: &'static str,
    view: &'static str,
    exclude_featured_facilities: bool,
    tee_time_count: u32,
    current_client_date: String,
}

pub(crate) fn search_body(request: &SearchRequest, now: DateTime<Utc>) -> SearchBody {
    let window = request.time_window();
    SearchBody {
        radius: request.radius_miles(),
        latitude: request.latitude().to_string(),
        longitude: request.longitude().to_string(),
        page_size: PAGE_SIZE,
        page_number: 0,
        search_type: 0,
        sort_by: "Facilities.Distance",
        sort_direction: 0,
        date: request.date().format("%b %-d, %Y").to_string(),
        price_min: 0,
        price_max: MAX_PRICE,
        players: request.players(),
        holes: request.holes().code(),
        facility_type: 0,
        rate_type: "all",
        time_min: window.min,
        time_max: window.max,
        sort_by_rollup: "Facilities.Distance",
        view: "Course",
        exclude_featured_facilities: false,
        tee_time_count: TEE_TIMES_PER_FACILITY,
        current_client_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
