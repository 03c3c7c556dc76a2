pub mod app_config;
pub mod config;
pub mod listing;
pub mod search;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::{Listing, SourceStrategy, UNKNOWN_HOLES};
pub use search::{HolesPreference, SearchDefaults, SearchQuery, SearchRequest, TimeOfDay, TimeWindow};

/// Errors raised while validating caller input, before any acquisition runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// One or more required search parameters were absent or blank.
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A parameter was present but could not be interpreted.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl CoreError {
    /// Stable machine-readable code for API error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        "validation_error"
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
