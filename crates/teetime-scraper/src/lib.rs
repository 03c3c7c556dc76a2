//! Tee-time acquisition from the upstream booking platform.
//!
//! The primary path mints an anti-forgery token in a remote browser and
//! calls the platform's internal JSON search endpoint; the fallback path
//! scrapes the rendered search page. [`AcquisitionContext`] ties both
//! together behind a small state machine.

pub mod backoff;
pub mod browser;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fallback;
mod listing;
pub mod normalize;
pub mod orchestrator;
pub mod session;
pub mod types;
pub mod urls;

pub use backoff::ForbiddenBackoff;
pub use browser::{
    BrowserConnector, BrowserError, BrowserPage, ChromiumConnector, Fingerprint, PageLease,
};
pub use client::ApiClient;
pub use config::AcquisitionConfig;
pub use diagnostics::{CapturedArtifacts, Diagnostics};
pub use error::{FatalAcquisitionError, ScraperError, Stage, StageFailure};
pub use fallback::{extract_listings, FallbackScraper, ResultSelectors, ScrapeTimeouts};
pub use normalize::{detect_shape, normalize_response, ResponseShape};
pub use orchestrator::{
    Acquisition, AcquisitionContext, AcquisitionMode, AcquisitionState, Orchestrator, Outcome,
};
pub use session::{extract_token, Session, SessionAcquirer};
pub use types::RawUpstreamResponse;
pub use urls::UpstreamUrls;
