//! Chart Routes
//!
//! - GET /api/v1/charts/messages - Hourly message counts for the last day
//!
//! A failed upstream fetch still answers 200; the chart renders an empty
//! series under a flagged title.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::ChartResponse;
use crate::api::state::AppState;
use crate::display::chart_title;

const MESSAGES_TITLE: &str = "Messages";

/// GET /api/v1/charts/messages
pub async fn messages_chart(State(state): State<Arc<AppState>>) -> Json<ChartResponse> {
    let (error, buckets) = match state.dashboard.messages_chart().await {
        Ok(buckets) => (false, buckets),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch messages chart");
            (true, Vec::new())
        }
    };

    Json(ChartResponse {
        title: chart_title(MESSAGES_TITLE, error),
        error,
        buckets: buckets.into_iter().map(Into::into).collect(),
    })
}
