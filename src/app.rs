use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::ChatRooms;
use crate::error::{ApiError, ApiResult};
use crate::hub::LiveHub;
use crate::routes::{health, proxy, ws};
use crate::state::FixtureStore;
use crate::upstream::ApiSportsClient;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Option<Arc<ApiSportsClient>>,
    pub store: FixtureStore,
    pub hub: LiveHub,
    pub chat: Arc<ChatRooms>,
    pub polling: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        upstream: Option<ApiSportsClient>,
        store: FixtureStore,
        hub: LiveHub,
        polling: bool,
    ) -> Self {
        Self {
            upstream: upstream.map(Arc::new),
            store,
            hub,
            chat: Arc::new(ChatRooms::new()),
            polling,
            started_at: Instant::now(),
        }
    }

    /// The upstream client, or the configuration error proxy routes report
    /// without touching the network.
    pub fn upstream(&self) -> ApiResult<Arc<ApiSportsClient>> {
        self.upstream.clone().ok_or(ApiError::MissingApiKey)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws::ws_handler))
        .route("/api/fixtures", get(proxy::get_fixtures))
        .route("/api/statistics", get(proxy::get_statistics))
        .route("/api/h2h", get(proxy::get_h2h))
        .route("/api/form", get(proxy::get_form))
        .route("/api/standings", get(proxy::get_standings))
        .route("/api/leagues", get(proxy::get_leagues))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
