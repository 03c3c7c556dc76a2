//! DOM scraping of the rendered search page, used when the API path fails.

use std::sync::Arc;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use teetime_core::{Listing, SearchRequest, SourceStrategy};

use crate::browser::{BrowserConnector, Fingerprint, PageLease};
use crate::diagnostics::Diagnostics;
use crate::error::ScraperError;
use crate::listing::ListingDraft;
use crate::session::millis;
use crate::urls::UpstreamUrls;

/// CSS selectors for the search results markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSelectors {
    pub results_container: String,
    pub card: String,
    pub course_name: String,
    pub tee_time: String,
    pub price: String,
    pub holes: String,
    pub booking_link: String,
}

impl Default for ResultSelectors {
    fn default() -> Self {
        Self {
            results_container: r#"[data-testid="search-results-list"]"#.to_owned(),
            card: r#"[data-testid="search-result"]"#.to_owned(),
            course_name: r#"[data-testid="facility-name"]"#.to_owned(),
            tee_time: r#"[data-testid="tee-time"]"#.to_owned(),
            price: r#"[data-testid="display-amount"]"#.to_owned(),
            holes: r#"[data-testid="hole-count"]"#.to_owned(),
            booking_link: r#"a[href*="/tee-times/facility"]"#.to_owned(),
        }
    }
}

/// Timing knobs for one scrape.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeTimeouts {
    pub navigation: Duration,
    /// Measured from navigation completion.
    pub results: Duration,
    pub poll_interval: Duration,
}

/// Loads the public search page in its own browser session and reads result
/// cards out of the DOM. Needs no anti-forgery token.
pub struct FallbackScraper {
    connector: Arc<dyn BrowserConnector>,
    urls: UpstreamUrls,
    fingerprint: Fingerprint,
    timeouts: ScrapeTimeouts,
    selectors: ResultSelectors,
    diagnostics: Option<Diagnostics>,
}

impl FallbackScraper {
    #[must_use]
    pub fn new(
        connector: Arc<dyn BrowserConnector>,
        urls: UpstreamUrls,
        fingerprint: Fingerprint,
        timeouts: ScrapeTimeouts,
        selectors: ResultSelectors,
        diagnostics: Option<Diagnostics>,
    ) -> Self {
        Self {
            connector,
            urls,
            fingerprint,
            timeouts,
            selectors,
            diagnostics,
        }
    }

    /// Scrape listings for `request`, tagged [`SourceStrategy::Scrape`].
    ///
    /// The browser page is closed before this returns. Failures are preceded
    /// by a diagnostics capture when an artifact directory is configured.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::ScrapeTimeout`] if opening the page, navigation or
    ///   the results container does not complete in time.
    /// - [`ScraperError::SelectorNotFound`] if the container is missing from
    ///   the final document.
    /// - [`ScraperError::BrowserConnection`] if no page could be opened.
    pub async fn scrape(&self, request: &SearchRequest) -> Result<Vec<Listing>, ScraperError> {
        let url = self.urls.search_page(request).to_string();
        let open = PageLease::open(self.connector.as_ref(), &self.fingerprint, "fallback");
        let mut lease = tokio::time::timeout(self.timeouts.navigation, open)
            .await
            .map_err(|_| ScraperError::ScrapeTimeout {
                timeout_ms: millis(self.timeouts.navigation),
            })??;

        let result = self.scrape_page(&mut lease, &url).await;

        if let (Err(e), Some(diagnostics)) = (&result, &self.diagnostics) {
            tracing::warn!(code = e.code(), "fallback scrape failed; capturing diagnostics");
            if let Ok(page) = lease.page() {
                diagnostics.capture(page, "fallback").await;
            }
        }
        lease.release().await;

        let listings = result?;
        tracing::info!(count = listings.len(), "fallback scrape complete");
        Ok(listings)
    }

    async fn scrape_page(
        &self,
        lease: &mut PageLease,
        url: &str,
    ) -> Result<Vec<Listing>, ScraperError> {
        let page = lease.page()?;

        match tokio::time::timeout(self.timeouts.navigation, page.navigate(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::ScrapeTimeout {
                    timeout_ms: millis(self.timeouts.navigation),
                })
            }
        }

        let container = self.selectors.results_container.as_str();
        let wait = async {
            loop {
                if page.has_element(container).await? {
                    return Ok::<(), ScraperError>(());
                }
                tokio::time::sleep(self.timeouts.poll_interval).await;
            }
        };
        match tokio::time::timeout(self.timeouts.results, wait).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::ScrapeTimeout {
                    timeout_ms: millis(self.timeouts.results),
                })
            }
        }

        let html = tokio::time::timeout(self.timeouts.results, page.content())
            .await
            .map_err(|_| ScraperError::ScrapeTimeout {
                timeout_ms: millis(self.timeouts.results),
            })??;
        extract_listings(&html, &self.selectors, &self.urls)
    }
}

/// Read result cards out of a rendered search page.
///
/// Cards without a course name or a resolvable booking link are dropped;
/// missing price or holes become empty text and `"N/A"`.
///
/// # Errors
///
/// Returns [`ScraperError::SelectorNotFound`] if the results container is
/// absent or a configured selector does not parse.
pub fn extract_listings(
    html: &str,
    selectors: &ResultSelectors,
    urls: &UpstreamUrls,
) -> Result<Vec<Listing>, ScraperError> {
    let parse = |s: &str| {
        Selector::parse(s).map_err(|_| ScraperError::SelectorNotFound {
            selector: s.to_owned(),
        })
    };
    let container = parse(&selectors.results_container)?;
    let card = parse(&selectors.card)?;
    let course_name = parse(&selectors.course_name)?;
    let tee_time = parse(&selectors.tee_time)?;
    let price = parse(&selectors.price)?;
    let holes = parse(&selectors.holes)?;
    let booking_link = parse(&selectors.booking_link)?;

    let document = Html::parse_document(html);
    let Some(root) = document.select(&container).next() else {
        return Err(ScraperError::SelectorNotFound {
            selector: selectors.results_container.clone(),
        });
    };

    let cards: Vec<ElementRef<'_>> = root.select(&card).collect();
    let total = cards.len();
    let listings: Vec<Listing> = cards
        .into_iter()
        .filter_map(|card| {
            ListingDraft {
                course_name: text_of(card, &course_name),
                address: String::new(),
                tee_time: text_of(card, &tee_time),
                price_display: text_of(card, &price),
                holes: text_of(card, &holes),
                booking_url: card
                    .select(&booking_link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .and_then(|href| urls.resolve(href)),
                players: None,
                image_url: None,
            }
            .finish(SourceStrategy::Scrape)
        })
        .collect();

    if listings.len() < total {
        tracing::debug!(dropped = total - listings.len(), "dropped incomplete result cards");
    }
    Ok(listings)
}

/// Whitespace-collapsed text of the first match, if any and non-blank.
fn text_of(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let el = card.select(selector).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
