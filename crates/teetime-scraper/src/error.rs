use thiserror::Error;

use crate::browser::BrowserError;

/// Stage-local failures of the acquisition pipeline.
///
/// None of these cross the service boundary on their own: API-path errors are
/// turned into a fallback attempt by the orchestrator, and fallback errors are
/// wrapped in [`FatalAcquisitionError`]. Messages never contain the
/// anti-forgery token or the remote-browser credential.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("anti-forgery token not found on {url}")]
    TokenNotFound { url: String },

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("remote browser error: {0}")]
    BrowserConnection(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unrecognized upstream response: {reason}")]
    Parse { reason: String },

    #[error("search results did not render within {timeout_ms}ms")]
    ScrapeTimeout { timeout_ms: u64 },

    #[error("selector {selector} matched nothing")]
    SelectorNotFound { selector: String },

    #[error("API path exceeded its {budget_ms}ms budget")]
    ApiPathTimeout { budget_ms: u64 },

    #[error("API path skipped after repeated 403 responses ({remaining_secs}s of back-off left)")]
    BackingOff { remaining_secs: u64 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// Stable machine-readable code, used in logs and error payloads.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ScraperError::TokenNotFound { .. } => "token_not_found",
            ScraperError::NavigationTimeout { .. } => "navigation_timeout",
            ScraperError::BrowserConnection(_) => "browser_connection_error",
            ScraperError::Http { .. } => "http_error",
            ScraperError::Network(_) => "network_error",
            ScraperError::Parse { .. } => "parse_error",
            ScraperError::ScrapeTimeout { .. } => "scrape_timeout",
            ScraperError::SelectorNotFound { .. } => "selector_not_found",
            ScraperError::ApiPathTimeout { .. } => "api_path_timeout",
            ScraperError::BackingOff { .. } => "backing_off",
            ScraperError::InvalidUrl { .. } => "invalid_url",
        }
    }

    /// The upstream HTTP status, when this error carries one.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ScraperError::Http { status, .. } => Some(*status),
            ScraperError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<BrowserError> for ScraperError {
    fn from(err: BrowserError) -> Self {
        ScraperError::BrowserConnection(err.to_string())
    }
}

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Session,
    Api,
    Normalize,
    Fallback,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Session => "session",
            Stage::Api => "api",
            Stage::Normalize => "normalize",
            Stage::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage error tagged with the stage it came from.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: ScraperError,
}

impl StageFailure {
    #[must_use]
    pub fn new(stage: Stage, error: ScraperError) -> Self {
        Self { stage, error }
    }
}

/// Both the API path and the fallback scrape failed for one request.
#[derive(Debug, Error)]
#[error("tee-time acquisition failed ({}); fallback scrape failed: {fallback_error}", describe_api_failure(.api_failure.as_ref()))]
pub struct FatalAcquisitionError {
    /// `None` when the API path was never attempted.
    pub api_failure: Option<StageFailure>,
    pub fallback_error: ScraperError,
    /// Last upstream HTTP status seen on the API path.
    pub last_http_status: Option<u16>,
}

impl FatalAcquisitionError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        "acquisition_failed"
    }

    /// Stage at which the API path gave up, if it ran.
    #[must_use]
    pub fn api_stage(&self) -> Option<Stage> {
        self.api_failure.as_ref().map(|f| f.stage)
    }
}

fn describe_api_failure(failure: Option<&StageFailure>) -> String {
    match failure {
        Some(f) => format!("API path failed at {} with {}", f.stage, f.error.code()),
        None => "API path not attempted".to_string(),
    }
}
