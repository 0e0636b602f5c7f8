use std::time::Duration;

use axum::Router;
use tracing::{error, info, Level};

mod routes;
mod models;
mod utils;
mod state;

use crate::utils::conf_helper::{init_config_and_bind, get_cached_config};
use crate::state::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    // === CONFIG + LISTENER ===
    let listener = init_config_and_bind()
        .await
        .map_err(|e| anyhow::anyhow!("Init failed: {e}"))?;

    let config = get_cached_config()
        .ok_or_else(|| anyhow::anyhow!("Config missing after init"))?;

    info!(
        "Server initialized on {}:{}",
        config.connection.ip,
        config.connection.port
    );

    let state = AppState::new(Duration::from_millis(config.playback.frame_interval_ms));

    if let Some(source) = &config.source {
        // A bad startup source is logged; the server still comes up
        let service = state.service.clone();
        let source = source.clone();
        tokio::spawn(async move {
            if let Err(e) = service.load(&source).await {
                error!("Startup load of {} failed: {}", source.describe(), e);
            }
        });
    }

    let app = Router::new()
        .merge(routes::info_routes::health_routes())
        .merge(routes::data_routes::data_routes(state.clone()))
        .merge(routes::playback_routes::playback_routes(state));

    axum::serve(listener, app).await?;
    Ok(())
}
