use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::target_dto::*},
    error::AppError,
    models::time::now_ms,
    services::adoption::{timeline_series, users_today},
};

pub async fn list_targets(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let targets: Vec<TargetResponse> = state
        .registry
        .iter()
        .map(|target| {
            let curve = state.curves.get(&target.key);
            TargetResponse {
                key: target.key.clone(),
                display_name: target.display_name.clone(),
                metric_label: target.metric_label.clone(),
                window_floor: target.window_floor,
                launch_date: curve.as_ref().map(|c| c.launch_date()),
                today_users: curve.as_ref().map(|c| users_today(c)),
            }
        })
        .collect();

    let total = targets.len();
    Ok(Json(ListTargetsResponse { targets, total }))
}

pub async fn get_timeline(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting timeline: {}", key);

    let target = state
        .registry
        .get(&key)
        .ok_or_else(|| AppError::NotFound(format!("Target not found: {}", key)))?;
    let curve = state
        .curves
        .curve_or_default(&target.key, target.window_floor);
    let unit = state.config.curves.display_unit;

    Ok(Json(TimelineResponse {
        key: target.key.clone(),
        display_name: target.display_name.clone(),
        metric_label: target.metric_label.clone(),
        unit,
        launch_date: curve.launch_date(),
        series: timeline_series(&curve, now_ms(), unit),
    }))
}
