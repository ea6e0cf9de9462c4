//! Metrics Routes
//!
//! Read-only views of the running pollers.
//!
//! - GET /api/v1/metrics - Every metric card
//! - GET /api/v1/metrics/:name - One metric card

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{MetricListResponse, MetricSnapshotResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/metrics
pub async fn list_metrics(State(state): State<Arc<AppState>>) -> Json<MetricListResponse> {
    let metrics: Vec<MetricSnapshotResponse> = state
        .dashboard
        .snapshots()
        .into_iter()
        .map(MetricSnapshotResponse::from)
        .collect();

    let errors = metrics.iter().filter(|m| m.display.is_error()).count();

    Json(MetricListResponse {
        total: metrics.len(),
        errors,
        metrics,
    })
}

/// GET /api/v1/metrics/:name
pub async fn get_metric(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<MetricSnapshotResponse>> {
    let snapshot = state
        .dashboard
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Metric '{}' not found", name)))?;

    Ok(Json(snapshot.into()))
}
