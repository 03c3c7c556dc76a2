//! Integration tests for `AcquisitionContext::acquire`.
//!
//! The upstream JSON endpoint is a `wiremock` server; the remote browser is
//! the scripted fake from `common`. Each scenario checks both the outcome and
//! that every browser page opened was closed again.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use teetime_core::{SearchRequest, SourceStrategy};
use teetime_scraper::{
    AcquisitionContext, AcquisitionMode, AcquisitionState, Outcome, ScraperError, Stage,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, FakeBrowser, Navigation, PageScript};

const API_PATH: &str = "/api/tee-times/tee-time-results";

fn orlando() -> SearchRequest {
    SearchRequest::new(
        NaiveDate::from_ymd_opt(2025, 7, 17).unwrap(),
        28.53834,
        -81.37923,
        2,
    )
    .unwrap()
}

fn context(server: &MockServer, browser: &Arc<FakeBrowser>) -> AcquisitionContext {
    AcquisitionContext::new(test_config(&server.uri()), browser.clone(), None)
        .expect("failed to build acquisition context")
}

fn shape_a_body() -> serde_json::Value {
    json!({
        "ttResults": {
            "facilities": [{
                "name": "Dubsdread Golf Course",
                "address": {"line1": "549 W Par St", "city": "Orlando", "stateProvinceCode": "FL"},
                "seoFriendlyName": "1234-dubsdread-golf-course",
                "minDateFormatted": "7:10 AM",
                "maxDateFormatted": "5:40 PM",
                "minPriceFormatted": "$29.00",
                "maxPriceFormatted": "$65.00",
                "teeTimes": [
                    {"teeTime": "7:10 AM", "displayAmount": "$45.00", "holes": 18,
                     "teeTimeBookingUrl": "/tee-times/facility/1234/tee-time/111"},
                    {"teeTime": "7:20 AM", "displayAmount": "$45.00", "holes": 18,
                     "teeTimeBookingUrl": "/tee-times/facility/1234/tee-time/112"}
                ]
            }]
        }
    })
}

// ---------------------------------------------------------------------------
// API path success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orlando_shape_a_response_yields_two_api_listings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(header("__RequestVerificationToken", "tok-orlando"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shape_a_body()))
        .expect(1)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("tok-orlando")]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .expect("acquisition should succeed");

    assert_eq!(acquisition.strategy, SourceStrategy::Api);
    assert_eq!(acquisition.listings.len(), 2);
    assert!(acquisition
        .listings
        .iter()
        .all(|l| l.source_strategy == SourceStrategy::Api));
    assert_eq!(
        acquisition.listings[0].course_name,
        acquisition.listings[1].course_name
    );
    assert_eq!(acquisition.listings[0].tee_time, "7:10 AM");
    assert!(acquisition.api_failure.is_none());
    assert_eq!(
        acquisition.states,
        vec![
            AcquisitionState::Idle,
            AcquisitionState::AcquiringSession,
            AcquisitionState::QueryingApi,
            AcquisitionState::Normalizing,
            AcquisitionState::Done(Outcome::Success),
        ]
    );
    assert_eq!(browser.counters.opened(), 1);
    assert_eq!(browser.counters.closed(), 1);
}

#[tokio::test]
async fn session_page_is_the_search_url_for_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ttResults": {"facilities": []}})))
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("tok")]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert!(acquisition.listings.is_empty());
    assert_eq!(acquisition.strategy, SourceStrategy::Api);
    let navigated = browser.counters.navigated();
    assert_eq!(navigated.len(), 1);
    assert!(navigated[0].starts_with(&format!("{}/tee-times/search?", server.uri())));
    assert!(navigated[0].contains("startDate=2025-07-17"));
    assert!(navigated[0].contains("lat=28.53834"));
}

// ---------------------------------------------------------------------------
// API path failures fall back exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_falls_back_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shape_a_body()))
        .expect(0)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::blocked(), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert_eq!(acquisition.listings.len(), 2);
    assert!(acquisition
        .listings
        .iter()
        .all(|l| l.source_strategy == SourceStrategy::Scrape));
    let failure = acquisition.api_failure.unwrap();
    assert_eq!(failure.stage, Stage::Session);
    assert!(matches!(failure.error, ScraperError::TokenNotFound { .. }));
    assert_eq!(browser.counters.opened(), 2);
    assert_eq!(browser.counters.closed(), 2);
}

#[tokio::test]
async fn http_500_falls_back_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("tok"), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert_eq!(acquisition.listings.len(), 2);
    let failure = acquisition.api_failure.unwrap();
    assert_eq!(failure.stage, Stage::Api);
    assert_eq!(failure.error.http_status(), Some(500));
    assert_eq!(
        acquisition.states,
        vec![
            AcquisitionState::Idle,
            AcquisitionState::AcquiringSession,
            AcquisitionState::QueryingApi,
            AcquisitionState::FallbackScraping,
            AcquisitionState::Done(Outcome::Success),
        ]
    );
    assert_eq!(browser.counters.opened(), 2);
    assert_eq!(browser.counters.closed(), 2);
}

#[tokio::test]
async fn unrecognized_shape_falls_back_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "maintenance"})))
        .expect(1)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("tok"), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    let failure = acquisition.api_failure.unwrap();
    assert_eq!(failure.stage, Stage::Normalize);
    assert!(matches!(failure.error, ScraperError::Parse { .. }));
    assert_eq!(browser.counters.opened(), 2);
    assert_eq!(browser.counters.closed(), 2);
}

#[tokio::test]
async fn html_api_body_falls_back_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Pardon our interruption</body></html>", "text/html"),
        )
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("tok"), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert_eq!(acquisition.api_failure.unwrap().stage, Stage::Normalize);
}

#[tokio::test]
async fn browser_connection_failure_falls_back_to_scrape() {
    let server = MockServer::start().await;
    let browser = FakeBrowser::new([PageScript::connect_failure(), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    let failure = acquisition.api_failure.unwrap();
    assert!(matches!(failure.error, ScraperError::BrowserConnection(_)));
    assert_eq!(browser.counters.opened(), 1);
    assert_eq!(browser.counters.closed(), 1);
}

#[tokio::test]
async fn navigation_hang_is_bounded_and_falls_back() {
    let server = MockServer::start().await;
    let browser = FakeBrowser::new([
        PageScript::token("tok").with_navigation(Navigation::Hang),
        PageScript::results(),
    ]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    let failure = acquisition.api_failure.unwrap();
    assert!(matches!(failure.error, ScraperError::NavigationTimeout { .. }));
    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert_eq!(browser.counters.closed(), 2);
}

// ---------------------------------------------------------------------------
// Fallback failures are fatal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fallback_timeout_is_fatal_and_reports_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::token("secret-token"), PageScript::blocked()]);

    let err = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .expect_err("acquisition should fail");

    assert_eq!(err.code(), "acquisition_failed");
    assert_eq!(err.api_stage(), Some(Stage::Api));
    assert_eq!(err.last_http_status, Some(503));
    assert!(matches!(err.fallback_error, ScraperError::ScrapeTimeout { .. }));
    assert!(!err.to_string().contains("secret-token"));
    assert_eq!(browser.counters.opened(), 2);
    assert_eq!(browser.counters.closed(), 2);
}

#[tokio::test]
async fn fallback_connection_failure_is_fatal() {
    let server = MockServer::start().await;
    let browser = FakeBrowser::new([PageScript::blocked(), PageScript::connect_failure()]);

    let err = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap_err();

    assert_eq!(err.api_stage(), Some(Stage::Session));
    assert_eq!(err.last_http_status, None);
    assert!(matches!(err.fallback_error, ScraperError::BrowserConnection(_)));
    assert_eq!(browser.counters.opened(), 1);
    assert_eq!(browser.counters.closed(), 1);
}

#[tokio::test]
async fn fallback_page_that_never_opens_is_fatal() {
    let server = MockServer::start().await;
    let browser = FakeBrowser::new([PageScript::connect_hang()]);

    let err = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        context(&server, &browser).acquire(&orlando(), AcquisitionMode::ScrapeOnly),
    )
    .await
    .expect("acquisition must finish within the configured timeouts")
    .unwrap_err();

    assert!(err.api_failure.is_none());
    assert!(matches!(err.fallback_error, ScraperError::ScrapeTimeout { .. }));
    assert_eq!(browser.counters.opened(), 0);
}

#[tokio::test]
async fn session_page_that_never_opens_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shape_a_body()))
        .expect(0)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::connect_hang(), PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::Auto)
        .await
        .unwrap();

    let failure = acquisition.api_failure.unwrap();
    assert_eq!(failure.stage, Stage::Session);
    assert!(matches!(failure.error, ScraperError::NavigationTimeout { .. }));
    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert_eq!(browser.counters.opened(), 1);
    assert_eq!(browser.counters.closed(), 1);
}

// ---------------------------------------------------------------------------
// Modes and back-off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_only_mode_skips_api_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shape_a_body()))
        .expect(0)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([PageScript::results()]);

    let acquisition = context(&server, &browser)
        .acquire(&orlando(), AcquisitionMode::ScrapeOnly)
        .await
        .unwrap();

    assert_eq!(acquisition.strategy, SourceStrategy::Scrape);
    assert!(acquisition.api_failure.is_none());
    assert_eq!(
        acquisition.states,
        vec![
            AcquisitionState::Idle,
            AcquisitionState::FallbackScraping,
            AcquisitionState::Done(Outcome::Success),
        ]
    );
    assert_eq!(browser.counters.opened(), 1);
}

#[tokio::test]
async fn orchestrator_starts_idle_and_ends_terminal() {
    let server = MockServer::start().await;
    let browser = FakeBrowser::new([PageScript::results()]);
    let ctx = context(&server, &browser);
    let request = orlando();

    let orchestrator = ctx.orchestrator(&request, AcquisitionMode::ScrapeOnly);
    assert_eq!(orchestrator.state(), AcquisitionState::Idle);
    assert!(!orchestrator.state().is_terminal());

    let acquisition = orchestrator.run().await.unwrap();
    let (last, visited) = acquisition.states.split_last().unwrap();
    assert!(last.is_terminal());
    assert!(visited.iter().all(|state| !state.is_terminal()));
}

#[tokio::test]
async fn repeated_forbidden_opens_backoff_gate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    let browser = FakeBrowser::new([
        PageScript::token("tok"),
        PageScript::results(),
        PageScript::results(),
    ]);
    let mut config = test_config(&server.uri());
    config.forbidden_threshold = 1;
    let ctx = AcquisitionContext::new(config, browser.clone(), None).unwrap();

    let first = ctx.acquire(&orlando(), AcquisitionMode::Auto).await.unwrap();
    assert_eq!(first.api_failure.unwrap().error.http_status(), Some(403));

    let second = ctx.acquire(&orlando(), AcquisitionMode::Auto).await.unwrap();
    assert_eq!(second.strategy, SourceStrategy::Scrape);
    assert!(matches!(
        second.api_failure.unwrap().error,
        ScraperError::BackingOff { .. }
    ));
    assert_eq!(browser.counters.opened(), 3);
    assert_eq!(browser.counters.closed(), 3);
}
