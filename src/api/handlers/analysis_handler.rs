use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::analysis_dto::AnalyzeRequest},
    error::AppError,
};

/// Google access token from `Authorization: Bearer ...`, if any
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.mailbox_for(bearer_token(&headers), request.refresh_token.as_deref());
    debug!(
        mailbox = store.is_some(),
        manual = request.manual.len(),
        "Starting analysis"
    );

    let report = state
        .analysis_service
        .analyze(store, request.into_analysis_request()?)
        .await?;

    Ok(Json(report))
}
