use axum::{
    routing::{get, post},
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
    extract::{Path, Query, State},
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use telemetry_engine::{
    Entry, LoadError, LoadOutcome, RecordingSource, TelemetryEngine, TelemetryError, TrimWindow,
};

use crate::state::app_state::AppState;

#[derive(Deserialize, Debug)]
pub struct RangeQuery {
    pub from: Option<u32>,
    pub to: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct LookupQuery {
    pub time: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrimRequest {
    pub trim_start: Option<i64>,
    pub trim_end: Option<i64>,
}

#[derive(Serialize)]
struct SupersededResponse {
    superseded: u64,
}


/// =======================
/// ROUTER
/// =======================

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/load", post(load_recording))
        .route("/status", get(status))
        .route("/entries", get(entries_in_range))
        .route("/entries/{second}", get(entry_at))
        .route("/lookup", get(lookup_time))
        .route("/trim", get(get_trim).put(put_trim))
        .route("/visibility", get(get_visibility).put(put_visibility))
        .route("/series", get(series))
        .route("/route", get(route_points))
        .with_state(state)
}


/// =======================
/// ERRORS
/// =======================

/// Not-ready answers carry the readiness summary so a client can tell
/// "nothing loaded" from "still loading" from "load failed".
pub fn error_response(err: &TelemetryError, engine: &TelemetryEngine) -> Response {
    let status = match err {
        TelemetryError::NotReady | TelemetryError::EmptyRecording => {
            return (StatusCode::CONFLICT, Json(engine.status())).into_response();
        }
        TelemetryError::Load(LoadError::Io(_)) => StatusCode::BAD_REQUEST,
        TelemetryError::Load(LoadError::Http(_)) | TelemetryError::Load(LoadError::Status { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        TelemetryError::Load(_) | TelemetryError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}


/// =======================
/// HANDLERS
/// =======================

async fn load_recording(
    State(state): State<AppState>,
    Json(source): Json<RecordingSource>,
) -> Response {
    debug!("Load requested: {}", source.describe());

    match state.service.load(&source).await {
        Ok(LoadOutcome::Applied(summary)) => {
            info!("Loaded {} ({} entries)", source.describe(), summary.entries);
            Json(summary).into_response()
        }
        Ok(LoadOutcome::Superseded { generation }) => {
            debug!("Load {} superseded", generation);
            (
                StatusCode::CONFLICT,
                Json(SupersededResponse { superseded: generation }),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Load of {} failed: {}", source.describe(), e);
            let engine = state.service.engine().await;
            error_response(&e, &engine)
        }
    }
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.engine().await.status())
}

async fn entry_at(
    State(state): State<AppState>,
    Path(second): Path<u32>,
) -> Response {
    let engine = state.service.engine().await;
    if !engine.is_ready() {
        return error_response(&TelemetryError::NotReady, &engine);
    }

    let entry = engine.lookup(second).cloned();
    drop(engine);

    match entry {
        Some(entry) => Json(entry).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn entries_in_range(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let engine = state.service.engine().await;
    let bounds = match engine.recording() {
        Some(recording) => recording.bounds(),
        None => return error_response(&TelemetryError::NotReady, &engine),
    };

    // Open ends default to the recording bounds
    let from = range.from.or(bounds.map(|b| b.start)).unwrap_or(0);
    let to = range.to.or(bounds.map(|b| b.end)).unwrap_or(0);

    let entries: Vec<Entry> = match engine.entries_in_range(from, to) {
        Ok(entries) => entries.into_iter().cloned().collect(),
        Err(e) => return error_response(&e, &engine),
    };
    // Serialize without holding up the tick loop
    drop(engine);

    Json(entries).into_response()
}

async fn lookup_time(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Response {
    let engine = state.service.engine().await;
    if !engine.is_ready() {
        return error_response(&TelemetryError::NotReady, &engine);
    }

    let entry = engine.lookup_time(&query.time).cloned();
    drop(engine);

    match entry {
        Some(entry) => Json(entry).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_trim(State(state): State<AppState>) -> Response {
    let engine = state.service.engine().await;
    match engine.trim_window() {
        Ok(window) => Json(window).into_response(),
        Err(e) => error_response(&e, &engine),
    }
}

async fn put_trim(
    State(state): State<AppState>,
    Json(request): Json<TrimRequest>,
) -> Response {
    let mut engine = state.service.engine().await;

    let result = apply_trim(&mut engine, &request);

    match result {
        Ok(window) => Json(window).into_response(),
        Err(e) => error_response(&e, &engine),
    }
}

/// Each edge is clamped against the other one, so a window moving right has
/// to move its end first.
fn apply_trim(
    engine: &mut TelemetryEngine,
    request: &TrimRequest,
) -> Result<TrimWindow, TelemetryError> {
    let mut window = engine.trim_window()?;
    let end_first = request
        .trim_start
        .is_some_and(|start| start > i64::from(window.trim_end));

    if end_first {
        if let Some(end) = request.trim_end {
            window = engine.set_trim_end(end)?;
        }
    }
    if let Some(start) = request.trim_start {
        window = engine.set_trim_start(start)?;
    }
    if !end_first {
        if let Some(end) = request.trim_end {
            window = engine.set_trim_end(end)?;
        }
    }
    Ok(window)
}

async fn get_visibility(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.engine().await.visibility().clone())
}

async fn put_visibility(
    State(state): State<AppState>,
    Json(titles): Json<Vec<String>>,
) -> impl IntoResponse {
    let mut engine = state.service.engine().await;
    engine.set_visibility(titles);
    Json(engine.visibility().clone())
}

async fn series(State(state): State<AppState>) -> Response {
    let mut engine = state.service.engine().await;
    let series = match engine.chart_series() {
        Ok(series) => series,
        Err(e) => return error_response(&e, &engine),
    };
    // The cached series is shared; serialize it after releasing the engine
    drop(engine);

    Json(series.as_slice()).into_response()
}

async fn route_points(State(state): State<AppState>) -> Response {
    let engine = state.service.engine().await;
    let points = match engine.route() {
        Ok(points) => points,
        Err(e) => return error_response(&e, &engine),
    };
    drop(engine);

    Json(points).into_response()
}
