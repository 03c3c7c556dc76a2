use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use teetime_core::{Listing, SearchQuery};
use teetime_scraper::AcquisitionMode;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// `GET /api/tee-times`: one acquisition per call.
///
/// Responds with a bare array of listings in upstream order. Dropping the
/// response future (client disconnect) cancels the acquisition and releases
/// its browser pages.
pub(super) async fn search_tee_times(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let Query(query) = query
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    let request = query
        .into_request(&state.defaults)
        .map_err(|e| ApiError::new(req_id.0.clone(), e.code(), e.to_string()))?;

    tracing::info!(
        request_id = %req_id.0,
        date = %request.date(),
        players = request.players(),
        radius_miles = request.radius_miles(),
        "tee-time search started"
    );

    let acquisition = state
        .acquisition
        .acquire(&request, AcquisitionMode::Auto)
        .await
        .map_err(|e| ApiError::from_fatal(req_id.0.clone(), &e))?;

    if let Some(failure) = &acquisition.api_failure {
        tracing::info!(
            request_id = %req_id.0,
            stage = %failure.stage,
            code = failure.error.code(),
            "served tee times from fallback scrape"
        );
    }

    Ok(Json(acquisition.listings))
}
