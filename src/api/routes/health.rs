//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (fails only when every mounted poller is failing)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Fails only when every mounted poller is past its error threshold; an
/// empty dashboard is ready.
pub async fn readiness(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    match overall_status(&state) {
        "unhealthy" => Err(ApiError::ServiceUnavailable(
            "every metric poller is failing".to_string(),
        )),
        _ => Ok(StatusCode::OK),
    }
}

/// GET /health
///
/// Full health status with poller counts.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: overall_status(&state).to_string(),
        pollers: state.dashboard.len(),
        pollers_in_error: state.dashboard.error_count(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn overall_status(state: &AppState) -> &'static str {
    let total = state.dashboard.len();
    let failing = state.dashboard.error_count();

    if failing == 0 {
        "healthy"
    } else if failing < total {
        "degraded"
    } else {
        "unhealthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
