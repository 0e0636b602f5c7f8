use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, error};

use crate::core::engine::{EngineEvent, TelemetryEngine};
use crate::core::format::Entry;
use crate::core::service::TelemetryService;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaybackFrame {
    current_second: u32,
    is_playing: bool,
    entry: Option<Entry>,
    seq: u64,
    end_flag: bool,
}

/// Pushes one frame per playback change (tick, seek, play, pause, reload) to
/// the socket until the client goes away. The frame for the recording's last
/// second carries `end_flag`; the stream stays open so a seek can resume it.
pub async fn handle_playback_stream(mut socket: WebSocket, service: TelemetryService) {
    info!("playback stream started");

    let mut seq: u64 = 0;
    let mut events = service.subscribe().await;

    // Current position first, so the client does not wait for the next tick
    if let Some(frame) = current_frame(&service, seq).await {
        if !send_frame(&mut socket, &frame).await {
            return;
        }
        seq += 1;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!("ws receive failed: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            event = events.recv() => {
                match event {
                    Ok(EngineEvent::Playback(_)) | Ok(EngineEvent::Loaded(_)) => {
                        let Some(frame) = current_frame(&service, seq).await else {
                            continue;
                        };
                        if !send_frame(&mut socket, &frame).await {
                            return;
                        }
                        seq += 1;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("playback stream lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("playback stream finished after {} frames", seq);
}

async fn current_frame(service: &TelemetryService, seq: u64) -> Option<PlaybackFrame> {
    // 🔒 Lock the engine briefly to snapshot the current second
    let engine = service.engine().await;
    frame_from(&engine, seq)
}

/// `end_flag` marks the frame sitting on the recording's last second.
fn frame_from(engine: &TelemetryEngine, seq: u64) -> Option<PlaybackFrame> {
    let state = engine.playback().ok()?;
    let last = engine.recording().and_then(|r| r.bounds()).map(|b| b.end);

    Some(PlaybackFrame {
        current_second: state.current_second,
        is_playing: state.is_playing,
        entry: engine.current_entry().cloned(),
        seq,
        end_flag: last == Some(state.current_second),
    })
}

async fn send_frame(socket: &mut WebSocket, frame: &PlaybackFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            error!("json serialize error: {}", e);
            return false;
        }
    };

    if let Err(e) = socket.send(Message::Text(json.into())).await {
        warn!("ws send failed: {}", e);
        return false;
    }
    true
}
