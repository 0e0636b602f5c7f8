use axum::{
    routing::{get, post},
    Router,
    response::{IntoResponse, Response},
    Json,
    extract::{State, ws::WebSocketUpgrade},
};

use serde::Deserialize;
use tracing::debug;

use telemetry_engine::handle_playback_stream;

use crate::routes::data_routes::error_response;
use crate::state::app_state::AppState;

#[derive(Deserialize, Debug)]
pub struct SeekRequest {
    pub second: i64,
}

pub fn playback_routes(state: AppState) -> Router {
    Router::new()
        .route("/playback", get(playback_state))
        .route("/playback/play", post(play))
        .route("/playback/pause", post(pause))
        .route("/playback/seek", post(seek))
        .route("/stream", get(stream))
        .with_state(state)
}

async fn current_state(state: &AppState) -> Response {
    let engine = state.service.engine().await;
    match engine.playback() {
        Ok(playback) => Json(playback).into_response(),
        Err(e) => error_response(&e, &engine),
    }
}

async fn playback_state(State(state): State<AppState>) -> Response {
    current_state(&state).await
}

async fn play(State(state): State<AppState>) -> Response {
    let started = state.service.play().await;
    debug!("Play requested (started: {})", started);
    current_state(&state).await
}

async fn pause(State(state): State<AppState>) -> Response {
    let paused = state.service.pause().await;
    debug!("Pause requested (paused: {})", paused);
    current_state(&state).await
}

async fn seek(
    State(state): State<AppState>,
    Json(request): Json<SeekRequest>,
) -> Response {
    if let Err(e) = state.service.seek(request.second).await {
        let engine = state.service.engine().await;
        return error_response(&e, &engine);
    }
    current_state(&state).await
}

async fn stream(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Frames are pushed from engine events; the engine is locked per frame only
    ws.on_upgrade(move |socket| handle_playback_stream(socket, state.service))
}
