//! `search` command: one acquisition against the live upstream, for operator
//! debugging of the token, API and scrape paths.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;
use teetime_core::{AppConfig, CoreError, HolesPreference, SearchRequest, TimeOfDay};
use teetime_scraper::{
    AcquisitionConfig, AcquisitionContext, AcquisitionMode, ChromiumConnector, Diagnostics,
};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Play date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Number of golfers; defaults to `TEETIME_DEFAULT_PLAYERS`
    #[arg(long)]
    pub players: Option<u32>,

    /// Search origin latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Search origin longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Search radius in miles; defaults to `TEETIME_DEFAULT_RADIUS_MILES`
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub radius: Option<u32>,

    /// Restrict to a time of day (morning, midday, afternoon, evening)
    #[arg(long)]
    pub time_of_day: Option<TimeOfDay>,

    /// Hole count (9, 18 or any)
    #[arg(long)]
    pub holes: Option<HolesPreference>,

    /// `auto` tries the JSON API first; `scrape` goes straight to the DOM
    #[arg(long, default_value = "auto")]
    pub mode: AcquisitionMode,
}

/// Resolve CLI arguments against the configured defaults.
pub(crate) fn build_request(
    args: &SearchArgs,
    config: &AppConfig,
) -> Result<SearchRequest, CoreError> {
    let defaults = config.search_defaults;
    let request = SearchRequest::new(
        args.date,
        args.lat,
        args.lon,
        args.players.unwrap_or(defaults.players),
    )?
    .with_radius_miles(args.radius.unwrap_or(defaults.radius_miles))
    .with_holes(args.holes.unwrap_or_default())
    .with_time_of_day(args.time_of_day)
    .with_default_window(defaults.time_window);
    Ok(request)
}

/// Run one acquisition and print the listings to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if the arguments fail validation, the pipeline cannot be
/// built from config, or both acquisition paths fail.
pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let request = build_request(args, config)?;

    let connector = Arc::new(ChromiumConnector::new(config.browser_ws_url.clone()));
    let diagnostics = config.artifacts_dir.clone().map(Diagnostics::new);
    let ctx = AcquisitionContext::new(
        AcquisitionConfig::from_app_config(config),
        connector,
        diagnostics,
    )?;

    let acquisition = ctx.acquire(&request, args.mode).await?;

    if let Some(failure) = &acquisition.api_failure {
        tracing::warn!(
            stage = %failure.stage,
            code = failure.error.code(),
            "API path failed; listings came from the fallback scrape"
        );
    }
    tracing::info!(
        count = acquisition.listings.len(),
        strategy = %acquisition.strategy,
        states = ?acquisition.states,
        "search complete"
    );

    println!("{}", serde_json::to_string_pretty(&acquisition.listings)?);
    Ok(())
}
