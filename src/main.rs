use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse_server::app::{AppState, create_app};
use pulse_server::config::Config;
use pulse_server::fake_feed::FakeFeed;
use pulse_server::feed::{PollSettings, Poller, spawn_poller};
use pulse_server::http_client::set_request_timeout;
use pulse_server::hub::LiveHub;
use pulse_server::state::FixtureStore;
use pulse_server::upstream::{ApiSportsClient, FixtureSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pulse_server=debug")),
        )
        .init();

    let config = Config::from_env();
    set_request_timeout(config.upstream_timeout);

    let store = FixtureStore::new();
    let hub = LiveHub::new(config.ws_capacity);
    let upstream = ApiSportsClient::from_config(&config);

    let source: Option<Arc<dyn FixtureSource>> = if config.fake_feed {
        info!("FAKE_FEED set, polling simulated fixtures");
        Some(Arc::new(FakeFeed::new()) as Arc<dyn FixtureSource>)
    } else {
        upstream
            .clone()
            .map(|client| Arc::new(client) as Arc<dyn FixtureSource>)
    };

    let polling = match source {
        Some(source) => {
            let poller = Poller::new(
                source,
                store.clone(),
                hub.clone(),
                PollSettings::from_config(&config),
            );
            spawn_poller(poller).context("failed to start fixture poller")?;
            true
        }
        None => {
            warn!("API_SPORTS_KEY is not set; live polling disabled and /api routes will fail");
            false
        }
    };

    let state = AppState::new(upstream, store, hub, polling);
    let app = create_app(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
