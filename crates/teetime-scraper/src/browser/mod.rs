//! Remote browser abstraction.
//!
//! Session acquisition and the fallback scraper only ever talk to a
//! [`BrowserConnector`]; the production implementation drives a remote
//! Chromium over the DevTools protocol, tests plug in a scripted fake.

mod chromium;
mod lease;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::ChromiumConnector;
pub use lease::PageLease;

/// Browser identity presented to the upstream platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Fingerprint {
    pub const DEFAULT_ACCEPT_LANGUAGE: &'static str = "en-US,en;q=0.9";

    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: Self::DEFAULT_ACCEPT_LANGUAGE.to_owned(),
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

/// Failures reported by a browser implementation.
///
/// Implementations must keep the connection credential out of these messages.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not open a browser session: {0}")]
    Connect(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser command failed: {0}")]
    Command(String),
}

/// Opens isolated pages on a (usually remote) browser.
#[async_trait]
pub trait BrowserConnector: Send + Sync {
    /// Open a fresh page that presents `fingerprint`.
    ///
    /// Each page is an independent session; closing it must release every
    /// resource the connector allocated for it.
    async fn open_page(&self, fingerprint: &Fingerprint)
        -> Result<Box<dyn BrowserPage>, BrowserError>;
}

/// A single open page. Always obtained through a [`PageLease`] in pipeline
/// code so that it is closed on every exit path.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate and wait for the document to finish loading.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Whether `selector` currently matches at least one element.
    async fn has_element(&mut self, selector: &str) -> Result<bool, BrowserError>;

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String, BrowserError>;

    /// Full-page PNG screenshot.
    async fn screenshot_png(&mut self) -> Result<Vec<u8>, BrowserError>;

    /// Close the page and its session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), BrowserError>;
}
