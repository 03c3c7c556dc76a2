//! The acquisition state machine.
//!
//! ```text
//! Idle -> AcquiringSession -> QueryingApi -> Normalizing -> Done(Success)
//!              |                  |              |
//!              +------------------+--------------+--> FallbackScraping -> Done(Success | Fatal)
//! ```
//!
//! Any API-path failure leads to exactly one fallback scrape; a fallback
//! failure is terminal.

use std::sync::Arc;
use std::time::Duration;

use teetime_core::{Listing, SearchRequest, SourceStrategy};

use crate::backoff::ForbiddenBackoff;
use crate::browser::BrowserConnector;
use crate::client::ApiClient;
use crate::config::AcquisitionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{FatalAcquisitionError, ScraperError, Stage, StageFailure};
use crate::fallback::{FallbackScraper, ScrapeTimeouts};
use crate::normalize::normalize_response;
use crate::session::{millis, SessionAcquirer};
use crate::urls::UpstreamUrls;

/// Which paths an acquisition may take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// API path first, DOM scrape on failure.
    #[default]
    Auto,
    /// Skip the API path entirely.
    ScrapeOnly,
}

impl std::str::FromStr for AcquisitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "scrape" | "scrape-only" | "scrape_only" => Ok(Self::ScrapeOnly),
            other => Err(format!("unknown acquisition mode \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    AcquiringSession,
    QueryingApi,
    Normalizing,
    FallbackScraping,
    Done(Outcome),
}

impl AcquisitionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, AcquisitionState::Done(_))
    }
}

/// Result of a successful acquisition.
#[derive(Debug)]
pub struct Acquisition {
    /// In upstream order.
    pub listings: Vec<Listing>,
    pub strategy: SourceStrategy,
    /// Why the API path was abandoned, when the listings came from the
    /// fallback in [`AcquisitionMode::Auto`].
    pub api_failure: Option<StageFailure>,
    /// Every state visited, starting at `Idle` and ending in `Done`.
    pub states: Vec<AcquisitionState>,
}

/// Long-lived pipeline components shared by concurrent acquisitions.
///
/// Holds no per-request state: each [`Orchestrator`] opens its own browser
/// pages and mints its own token.
pub struct AcquisitionContext {
    urls: UpstreamUrls,
    sessions: SessionAcquirer,
    api: ApiClient,
    fallback: FallbackScraper,
    backoff: ForbiddenBackoff,
    api_path_budget: Duration,
}

impl AcquisitionContext {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for a bad upstream base URL and
    /// [`ScraperError::Network`] if the HTTP client cannot be built.
    pub fn new(
        config: AcquisitionConfig,
        connector: Arc<dyn BrowserConnector>,
        diagnostics: Option<Diagnostics>,
    ) -> Result<Self, ScraperError> {
        let urls = UpstreamUrls::new(&config.upstream_base_url)?;
        let api = ApiClient::new(
            urls.clone(),
            config.api_timeout,
            &config.fingerprint.user_agent,
            &config.fingerprint.accept_language,
        )?;
        let sessions = SessionAcquirer::new(
            Arc::clone(&connector),
            urls.clone(),
            config.fingerprint.clone(),
            config.navigation_timeout,
            diagnostics.clone(),
        );
        let fallback = FallbackScraper::new(
            connector,
            urls.clone(),
            config.fingerprint,
            ScrapeTimeouts {
                navigation: config.navigation_timeout,
                results: config.results_timeout,
                poll_interval: config.poll_interval,
            },
            config.selectors,
            diagnostics,
        );
        Ok(Self {
            urls,
            sessions,
            api,
            fallback,
            backoff: ForbiddenBackoff::new(config.forbidden_threshold, config.forbidden_cooldown),
            api_path_budget: config.api_path_budget,
        })
    }

    #[must_use]
    pub fn orchestrator<'a>(
        &'a self,
        request: &'a SearchRequest,
        mode: AcquisitionMode,
    ) -> Orchestrator<'a> {
        Orchestrator {
            ctx: self,
            request,
            mode,
            state: AcquisitionState::Idle,
            history: vec![AcquisitionState::Idle],
        }
    }

    /// Run one acquisition to completion.
    ///
    /// # Errors
    ///
    /// Returns [`FatalAcquisitionError`] when the fallback scrape fails.
    pub async fn acquire(
        &self,
        request: &SearchRequest,
        mode: AcquisitionMode,
    ) -> Result<Acquisition, FatalAcquisitionError> {
        self.orchestrator(request, mode).run().await
    }
}

/// Drives one request through the state machine. Consumed by [`run`](Self::run).
pub struct Orchestrator<'a> {
    ctx: &'a AcquisitionContext,
    request: &'a SearchRequest,
    mode: AcquisitionMode,
    state: AcquisitionState,
    history: Vec<AcquisitionState>,
}

impl Orchestrator<'_> {
    #[must_use]
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// # Errors
    ///
    /// Returns [`FatalAcquisitionError`] when the fallback scrape fails.
    pub async fn run(mut self) -> Result<Acquisition, FatalAcquisitionError> {
        let ctx = self.ctx;
        let api_failure = match self.mode {
            AcquisitionMode::ScrapeOnly => None,
            AcquisitionMode::Auto => match ctx.backoff.remaining().await {
                Some(remaining) => Some(StageFailure::new(
                    Stage::Api,
                    ScraperError::BackingOff {
                        remaining_secs: remaining.as_secs(),
                    },
                )),
                None => {
                    let api_result = self.budgeted_api_path().await;
                    match api_result {
                        Ok(listings) => {
                            return Ok(self.finish(listings, SourceStrategy::Api, None))
                        }
                        Err(failure) => Some(failure),
                    }
                }
            },
        };

        if let Some(failure) = &api_failure {
            tracing::warn!(
                stage = %failure.stage,
                code = failure.error.code(),
                error = %failure.error,
                "API path failed; falling back to DOM scrape"
            );
        }

        self.transition(AcquisitionState::FallbackScraping);
        match ctx.fallback.scrape(self.request).await {
            Ok(listings) => Ok(self.finish(listings, SourceStrategy::Scrape, api_failure)),
            Err(fallback_error) => {
                self.transition(AcquisitionState::Done(Outcome::Fatal));
                let last_http_status = api_failure
                    .as_ref()
                    .and_then(|f| f.error.http_status());
                tracing::error!(
                    code = fallback_error.code(),
                    error = %fallback_error,
                    last_http_status,
                    "tee-time acquisition failed"
                );
                Err(FatalAcquisitionError {
                    api_failure,
                    fallback_error,
                    last_http_status,
                })
            }
        }
    }

    async fn budgeted_api_path(&mut self) -> Result<Vec<Listing>, StageFailure> {
        let budget = self.ctx.api_path_budget;
        match tokio::time::timeout(budget, self.api_path()).await {
            Ok(result) => result,
            Err(_) => {
                let stage = match self.state {
                    AcquisitionState::AcquiringSession => Stage::Session,
                    AcquisitionState::Normalizing => Stage::Normalize,
                    _ => Stage::Api,
                };
                Err(StageFailure::new(
                    stage,
                    ScraperError::ApiPathTimeout {
                        budget_ms: millis(budget),
                    },
                ))
            }
        }
    }

    async fn api_path(&mut self) -> Result<Vec<Listing>, StageFailure> {
        let ctx = self.ctx;
        self.transition(AcquisitionState::AcquiringSession);
        let session = ctx
            .sessions
            .acquire(self.request)
            .await
            .map_err(|e| StageFailure::new(Stage::Session, e))?;

        self.transition(AcquisitionState::QueryingApi);
        let raw = match ctx.api.search(&session, self.request).await {
            Ok(raw) => {
                ctx.backoff.record_ok().await;
                raw
            }
            Err(e) => {
                if e.http_status() == Some(403) {
                    ctx.backoff.record_forbidden().await;
                } else {
                    ctx.backoff.record_ok().await;
                }
                return Err(StageFailure::new(Stage::Api, e));
            }
        };
        drop(session);

        self.transition(AcquisitionState::Normalizing);
        normalize_response(&raw, &ctx.urls).map_err(|e| StageFailure::new(Stage::Normalize, e))
    }

    fn finish(
        mut self,
        listings: Vec<Listing>,
        strategy: SourceStrategy,
        api_failure: Option<StageFailure>,
    ) -> Acquisition {
        self.transition(AcquisitionState::Done(Outcome::Success));
        tracing::info!(count = listings.len(), strategy = %strategy, "tee-time acquisition complete");
        Acquisition {
            listings,
            strategy,
            api_failure,
            states: self.history,
        }
    }

    fn transition(&mut self, next: AcquisitionState) {
        tracing::debug!(from = ?self.state, to = ?next, "acquisition state change");
        self.state = next;
        self.history.push(next);
    }
}
