use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub polling: bool,
    pub tracked_fixtures: usize,
    pub ws_clients: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        polling: state.polling,
        tracked_fixtures: state.store.len(),
        ws_clients: state.hub.online(),
    })
}
