use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::models::HealthResponse;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        session: state.session_summary(),
    })
}
