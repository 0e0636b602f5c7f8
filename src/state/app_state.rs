use std::time::Duration;

use telemetry_engine::{TelemetryEngine, TelemetryService};

#[derive(Clone)]
pub struct AppState {
    pub service: TelemetryService,
}

impl AppState {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            service: TelemetryService::new(TelemetryEngine::default())
                .with_frame_interval(frame_interval),
        }
    }
}

