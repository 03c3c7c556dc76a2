use crate::app_config::{AppConfig, Environment};
use crate::search::{SearchDefaults, TimeWindow};
use crate::ConfigError;

const BROWSERLESS_WS_BASE: &str = "wss://chrome.browserless.io";

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let non_empty = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        non_empty(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u8 = |var: &str, default: &str| -> Result<u8, ConfigError> {
        or_default(var, default)
            .parse::<u8>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let browser_ws_url = match (
        non_empty("TEETIME_BROWSER_WS_URL"),
        non_empty("BROWSERLESS_API_KEY"),
    ) {
        (Some(url), _) => url,
        (None, Some(key)) => format!("{BROWSERLESS_WS_BASE}?token={key}"),
        (None, None) => {
            return Err(ConfigError::MissingEnvVar(
                "TEETIME_BROWSER_WS_URL or BROWSERLESS_API_KEY".to_string(),
            ))
        }
    };
    if !(browser_ws_url.starts_with("ws://") || browser_ws_url.starts_with("wss://")) {
        // The value is a secret; report the scheme problem without echoing it.
        return Err(invalid(
            "TEETIME_BROWSER_WS_URL",
            "expected a ws:// or wss:// endpoint".to_string(),
        ));
    }

    let env = parse_environment(&or_default("TEETIME_ENV", "development"))?;

    let bind_addr = or_default("TEETIME_BIND_ADDR", "0.0.0.0:3001")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TEETIME_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TEETIME_LOG_LEVEL", "info");

    let upstream_base_url = or_default("TEETIME_UPSTREAM_BASE_URL", "https://www.golfnow.com")
        .trim_end_matches('/')
        .to_string();
    if !(upstream_base_url.starts_with("https://") || upstream_base_url.starts_with("http://")) {
        return Err(invalid(
            "TEETIME_UPSTREAM_BASE_URL",
            format!("expected an absolute http(s) URL, got \"{upstream_base_url}\""),
        ));
    }
    let user_agent = or_default("TEETIME_USER_AGENT", DEFAULT_USER_AGENT);

    let navigation_timeout_secs = parse_u64("TEETIME_NAVIGATION_TIMEOUT_SECS", "60")?;
    let results_timeout_secs = parse_u64("TEETIME_RESULTS_TIMEOUT_SECS", "30")?;
    let api_timeout_secs = parse_u64("TEETIME_API_TIMEOUT_SECS", "30")?;
    let api_path_budget_secs = parse_u64("TEETIME_API_PATH_BUDGET_SECS", "90")?;

    let radius_miles = parse_u32("TEETIME_DEFAULT_RADIUS_MILES", "20")?;
    let players = parse_u32("TEETIME_DEFAULT_PLAYERS", "2")?;
    if players == 0 {
        return Err(invalid(
            "TEETIME_DEFAULT_PLAYERS",
            "must be a positive integer".to_string(),
        ));
    }
    let time_min = parse_u8("TEETIME_DEFAULT_TIME_MIN", "10")?;
    let time_max = parse_u8("TEETIME_DEFAULT_TIME_MAX", "42")?;
    let time_window = TimeWindow::new(time_min, time_max).map_err(|e| {
        let var = if time_max > TimeWindow::LAST_SLOT {
            "TEETIME_DEFAULT_TIME_MAX"
        } else {
            "TEETIME_DEFAULT_TIME_MIN"
        };
        invalid(var, e.to_string())
    })?;

    // Set-but-empty disables capture; unset falls back to ./artifacts.
    let artifacts_dir = match lookup("TEETIME_ARTIFACTS_DIR") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(PathBuf::from(raw.trim())),
        Err(_) => Some(PathBuf::from("./artifacts")),
    };

    let forbidden_threshold = parse_u32("TEETIME_FORBIDDEN_THRESHOLD", "3")?;
    let forbidden_cooldown_secs = parse_u64("TEETIME_FORBIDDEN_COOLDOWN_SECS", "300")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        browser_ws_url,
        upstream_base_url,
        user_agent,
        navigation_timeout_secs,
        results_timeout_secs,
        api_timeout_secs,
        api_path_budget_secs,
        search_defaults: SearchDefaults {
            radius_miles,
            players,
            time_window,
        },
        artifacts_dir,
        forbidden_threshold,
        forbidden_cooldown_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TEETIME_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
