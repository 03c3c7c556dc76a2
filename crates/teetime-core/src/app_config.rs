use std::net::SocketAddr;
use std::path::PathBuf;

use crate::search::SearchDefaults;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Chrome DevTools websocket endpoint. Carries the remote-browser
    /// credential in its query string, so it is redacted from `Debug`.
    pub browser_ws_url: String,
    pub upstream_base_url: String,
    pub user_agent: String,
    pub navigation_timeout_secs: u64,
    pub results_timeout_secs: u64,
    pub api_timeout_secs: u64,
    pub api_path_budget_secs: u64,
    pub search_defaults: SearchDefaults,
    /// `None` disables diagnostics capture.
    pub artifacts_dir: Option<PathBuf>,
    pub forbidden_threshold: u32,
    pub forbidden_cooldown_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("browser_ws_url", &"[redacted]")
            .field("upstream_base_url", &self.upstream_base_url)
            .field("user_agent", &self.user_agent)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("results_timeout_secs", &self.results_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_path_budget_secs", &self.api_path_budget_secs)
            .field("search_defaults", &self.search_defaults)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("forbidden_threshold", &self.forbidden_threshold)
            .field("forbidden_cooldown_secs", &self.forbidden_cooldown_secs)
            .finish()
    }
}
