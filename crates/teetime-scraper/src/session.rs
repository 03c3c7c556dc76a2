//! Anti-forgery session acquisition through the remote browser.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use teetime_core::SearchRequest;

use crate::browser::{BrowserConnector, Fingerprint, PageLease};
use crate::diagnostics::Diagnostics;
use crate::error::ScraperError;
use crate::urls::UpstreamUrls;

/// Hidden form field carrying the token on the search page.
const TOKEN_INPUT_SELECTOR: &str = r#"input[name="__RequestVerificationToken"]"#;
/// Some page variants expose the token as a meta tag instead.
const TOKEN_META_SELECTOR: &str = r#"meta[name="RequestVerificationToken"]"#;

/// An anti-forgery token scoped to one acquisition.
///
/// Never cached or shared between requests. `Debug` hides the token.
#[derive(Clone)]
pub struct Session {
    token: String,
    acquired_at: DateTime<Utc>,
    source_url: String,
}

impl Session {
    #[must_use]
    pub fn new(token: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            acquired_at: Utc::now(),
            source_url: source_url.into(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// The page the token was read from; sent as `Referer` on the API call.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[redacted]")
            .field("acquired_at", &self.acquired_at)
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// Loads the public search page in a fresh browser session and reads the
/// anti-forgery token out of the rendered DOM.
pub struct SessionAcquirer {
    connector: Arc<dyn BrowserConnector>,
    urls: UpstreamUrls,
    fingerprint: Fingerprint,
    navigation_timeout: Duration,
    diagnostics: Option<Diagnostics>,
}

impl SessionAcquirer {
    #[must_use]
    pub fn new(
        connector: Arc<dyn BrowserConnector>,
        urls: UpstreamUrls,
        fingerprint: Fingerprint,
        navigation_timeout: Duration,
        diagnostics: Option<Diagnostics>,
    ) -> Self {
        Self {
            connector,
            urls,
            fingerprint,
            navigation_timeout,
            diagnostics,
        }
    }

    /// Acquire a session for `request`.
    ///
    /// The browser page is closed before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::BrowserConnection`] if no page could be opened or
    ///   the browser failed mid-command.
    /// - [`ScraperError::NavigationTimeout`] if the page could not be opened
    ///   or did not finish loading in time.
    /// - [`ScraperError::TokenNotFound`] if the page carries no token.
    pub async fn acquire(&self, request: &SearchRequest) -> Result<Session, ScraperError> {
        let url = self.urls.search_page(request).to_string();
        let open = PageLease::open(self.connector.as_ref(), &self.fingerprint, "session");
        let mut lease = tokio::time::timeout(self.navigation_timeout, open)
            .await
            .map_err(|_| ScraperError::NavigationTimeout {
                url: url.clone(),
                timeout_ms: millis(self.navigation_timeout),
            })??;

        let result = self.read_token(&mut lease, &url).await;

        if let (Err(e), Some(diagnostics)) = (&result, &self.diagnostics) {
            tracing::warn!(code = e.code(), "session acquisition failed; capturing diagnostics");
            if let Ok(page) = lease.page() {
                diagnostics.capture(page, "session").await;
            }
        }
        lease.release().await;

        let token = result?;
        tracing::debug!("anti-forgery token acquired");
        Ok(Session::new(token, url))
    }

    async fn read_token(&self, lease: &mut PageLease, url: &str) -> Result<String, ScraperError> {
        let page = lease.page()?;
        match tokio::time::timeout(self.navigation_timeout, page.navigate(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::NavigationTimeout {
                    url: url.to_owned(),
                    timeout_ms: millis(self.navigation_timeout),
                })
            }
        }
        let html = tokio::time::timeout(self.navigation_timeout, page.content())
            .await
            .map_err(|_| ScraperError::NavigationTimeout {
                url: url.to_owned(),
                timeout_ms: millis(self.navigation_timeout),
            })??;
        extract_token(&html).ok_or_else(|| ScraperError::TokenNotFound {
            url: url.to_owned(),
        })
    }
}

/// Find the anti-forgery token in a rendered search page.
///
/// Returns `None` when neither the hidden input nor the meta tag carries a
/// non-blank value.
#[must_use]
pub fn extract_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    [(TOKEN_INPUT_SELECTOR, "value"), (TOKEN_META_SELECTOR, "content")]
        .into_iter()
        .filter_map(|(selector, attr)| Selector::parse(selector).ok().map(|s| (s, attr)))
        .find_map(|(selector, attr)| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_owned)
        })
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
