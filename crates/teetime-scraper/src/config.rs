use std::time::Duration;

use teetime_core::AppConfig;

use crate::browser::Fingerprint;
use crate::fallback::ResultSelectors;

/// Runtime settings for the acquisition pipeline.
///
/// Built from [`AppConfig`] in the binaries; tests construct it directly with
/// short timeouts and a local upstream.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub upstream_base_url: String,
    pub fingerprint: Fingerprint,
    pub navigation_timeout: Duration,
    pub results_timeout: Duration,
    pub api_timeout: Duration,
    /// Bounds session acquisition plus the API call, independently of the
    /// fallback scrape's own timeouts.
    pub api_path_budget: Duration,
    pub poll_interval: Duration,
    pub selectors: ResultSelectors,
    pub forbidden_threshold: u32,
    pub forbidden_cooldown: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: "https://www.golfnow.com".to_owned(),
            fingerprint: Fingerprint::new(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
            ),
            navigation_timeout: Duration::from_secs(60),
            results_timeout: Duration::from_secs(30),
            api_timeout: Duration::from_secs(30),
            api_path_budget: Duration::from_secs(90),
            poll_interval: Duration::from_millis(250),
            selectors: ResultSelectors::default(),
            forbidden_threshold: 3,
            forbidden_cooldown: Duration::from_secs(300),
        }
    }
}

impl AcquisitionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            upstream_base_url: config.upstream_base_url.clone(),
            fingerprint: Fingerprint::new(config.user_agent.clone()),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            results_timeout: Duration::from_secs(config.results_timeout_secs),
            api_timeout: Duration::from_secs(config.api_timeout_secs),
            api_path_budget: Duration::from_secs(config.api_path_budget_secs),
            forbidden_threshold: config.forbidden_threshold,
            forbidden_cooldown: Duration::from_secs(config.forbidden_cooldown_secs),
            ..Self::default()
        }
    }
}
