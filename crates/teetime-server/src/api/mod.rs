mod tee_times;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use teetime_core::SearchDefaults;
use teetime_scraper::{AcquisitionContext, FatalAcquisitionError};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub acquisition: Arc<AcquisitionContext>,
    pub defaults: SearchDefaults,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FailureDetails>,
}

/// Diagnostic context attached to `acquisition_failed` errors. Carries error
/// codes and statuses only, never tokens or browser credentials.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FailureDetails {
    /// Stage at which the API path gave up; `None` when it never ran.
    pub api_stage: Option<&'static str>,
    pub api_error: Option<&'static str>,
    pub fallback_error: &'static str,
    pub last_http_status: Option<u16>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn from_fatal(request_id: impl Into<String>, err: &FatalAcquisitionError) -> Self {
        let mut api_error = Self::new(request_id, err.code(), err.to_string());
        api_error.error.details = Some(FailureDetails {
            api_stage: err.api_stage().map(|stage| stage.as_str()),
            api_error: err.api_failure.as_ref().map(|f| f.error.code()),
            fallback_error: err.fallback_error.code(),
            last_http_status: err.last_http_status,
        });
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "acquisition_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn acquisition_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/tee-times", get(tee_times::search_tee_times))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(acquisition_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData { status: "ok" },
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Ten acquisitions a minute. Each one may hold two remote browser sessions.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(10, Duration::from_secs(60))
}
