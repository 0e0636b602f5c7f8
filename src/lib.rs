// Telemetry playback engine
// Main library entry point

pub mod core;

// Re-export main types
pub use crate::core::clock::{ManualTimeSource, PlaybackState, TimeSource, TokioTimeSource};
pub use crate::core::data_handle::handle_playback_stream;
pub use crate::core::engine::{
    EngineEvent, EngineStatus, LoadOutcome, LoadedRecording, Readiness, RecordingSummary,
    TelemetryEngine,
};
pub use crate::core::error::{LoadError, Result, SchemaError, TelemetryError};
pub use crate::core::format::{
    ChartPoint, ChartSeries, ChartType, Entry, GeoPoint, LabelSnapshot, Recording,
    RecordingDocument, SecondBounds,
};
pub use crate::core::generator::GeneratorConfig;
pub use crate::core::loader::RecordingSource;
pub use crate::core::projector::VisibilitySet;
pub use crate::core::service::TelemetryService;
pub use crate::core::trim::TrimWindow;

#[cfg(test)]
mod tests {
    #[test]
    fn test_palettes() {
        use crate::core::constants::*;
        assert_eq!(LABEL_PALETTE.len(), 6);
        assert_eq!(CHART_PALETTE.len(), 6);
        assert_eq!(ADVANCE_PERIOD.as_millis(), 1000);
    }
}
