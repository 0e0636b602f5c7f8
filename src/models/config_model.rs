use serde::{Deserialize, Serialize};
use telemetry_engine::core::constants::DEFAULT_FRAME_INTERVAL_MS;
use telemetry_engine::RecordingSource;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub id: String,
    pub version: String,
    pub description: String,
    pub connection: Connection,
    /// Loaded once at startup when present.
    #[serde(default)]
    pub source: Option<RecordingSource>,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}
