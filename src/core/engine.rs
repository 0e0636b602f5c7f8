// Telemetry engine: recording, playback, trim and visibility state

use crate::core::clock::{PlaybackClock, PlaybackState, TimeSource, TokioTimeSource};
use crate::core::constants::EVENT_CHANNEL_CAPACITY;
use crate::core::error::{Result, SchemaError, TelemetryError};
use crate::core::format::*;
use crate::core::index::SecondIndex;
use crate::core::normalizer::normalize;
use crate::core::projector::{project, VisibilitySet};
use crate::core::trim::{TrimState, TrimWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A normalized recording and the index built from it. Always swapped into
/// the engine as one unit.
#[derive(Debug)]
pub struct LoadedRecording {
    id: Uuid,
    recording: Recording,
    index: SecondIndex,
}

impl LoadedRecording {
    pub fn prepare(doc: RecordingDocument) -> std::result::Result<Self, SchemaError> {
        let recording = normalize(doc)?;
        let index = SecondIndex::build(&recording.entries);
        debug!(
            "Indexed {} entries over {} second slots",
            index.filled(),
            index.len()
        );
        Ok(Self {
            id: Uuid::new_v4(),
            recording,
            index,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn lookup(&self, second: u32) -> Option<&Entry> {
        self.index.lookup(&self.recording.entries, second)
    }
}

#[derive(Debug, Clone)]
pub enum Readiness {
    NotLoaded,
    /// First load in flight, nothing to show yet.
    Loading,
    Ready(Arc<LoadedRecording>),
    /// Last load failed and there is no earlier recording to fall back on.
    Failed(TelemetryError),
}

/// Proof that a load was started. Consumed by `complete_load`.
#[derive(Debug)]
#[must_use = "a load token must be passed to complete_load"]
pub struct LoadToken {
    generation: u64,
}

impl LoadToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub id: Uuid,
    pub generation: u64,
    pub entries: usize,
    pub bounds: Option<SecondBounds>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub total_seconds: Option<u64>,
    pub label_count: Option<u32>,
    pub labels: Vec<String>,
    pub digital_sensors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied(RecordingSummary),
    /// A newer load was started before this one finished.
    Superseded { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    LoadStarted { generation: u64 },
    Loaded(RecordingSummary),
    LoadFailed { generation: u64, message: String },
    Playback(PlaybackState),
    Trim(TrimWindow),
    Visibility { titles: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: &'static str,
    pub loading: bool,
    pub error: Option<String>,
    pub recording: Option<RecordingSummary>,
}

/// Owns the loaded recording and its index, the playback clock, the trim
/// window and the visibility set. Consumers observe changes through
/// [`EngineEvent`]s.
///
/// Loads are split in two so the slow part can run without holding the
/// engine: [`TelemetryEngine::begin_load`] hands out a [`LoadToken`], the
/// caller prepares the recording, then [`TelemetryEngine::complete_load`]
/// commits it. Only the most recently issued token can commit.
pub struct TelemetryEngine {
    readiness: Readiness,
    clock: PlaybackClock,
    trim: TrimState,
    visibility: VisibilitySet,
    series_cache: Option<Arc<Vec<ChartSeries>>>,
    time: Arc<dyn TimeSource>,
    issued_generation: u64,
    committed_generation: u64,
    settled_generation: u64,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(Arc::new(TokioTimeSource::new()))
    }
}

impl TelemetryEngine {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            readiness: Readiness::NotLoaded,
            clock: PlaybackClock::new(),
            trim: TrimState::new(),
            visibility: VisibilitySet::new(),
            series_cache: None,
            time,
            issued_generation: 0,
            committed_generation: 0,
            settled_generation: 0,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // =======================
    // Loading
    // =======================

    pub fn begin_load(&mut self) -> LoadToken {
        self.issued_generation += 1;
        let generation = self.issued_generation;

        if !matches!(self.readiness, Readiness::Ready(_)) {
            self.readiness = Readiness::Loading;
        }

        info!("Load started (generation {})", generation);
        self.emit(EngineEvent::LoadStarted { generation });
        LoadToken { generation }
    }

    /// Commits a prepared recording, or records the failure. Stale tokens are
    /// dropped without touching state. A failure leaves an earlier recording
    /// in place.
    pub fn complete_load(
        &mut self,
        token: LoadToken,
        result: Result<LoadedRecording>,
    ) -> Result<LoadOutcome> {
        let generation = token.generation;
        if generation != self.issued_generation {
            debug!(
                "Dropping load {} superseded by {}",
                generation, self.issued_generation
            );
            return Ok(LoadOutcome::Superseded { generation });
        }
        self.settled_generation = generation;

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Load {} failed: {}", generation, e);
                if !matches!(self.readiness, Readiness::Ready(_)) {
                    self.readiness = Readiness::Failed(e.clone());
                }
                self.emit(EngineEvent::LoadFailed {
                    generation,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let loaded = Arc::new(loaded);
        let bounds = loaded.recording.bounds();

        self.clock.reset(bounds);
        self.trim.reset(bounds);
        self.series_cache = None;
        self.committed_generation = generation;
        self.readiness = Readiness::Ready(loaded);

        let summary = self.summary().ok_or(TelemetryError::NotReady)?;
        info!(
            "Load {} applied: {} entries, bounds {:?}",
            generation, summary.entries, summary.bounds
        );
        self.emit(EngineEvent::Loaded(summary.clone()));
        self.emit(EngineEvent::Playback(self.clock.state()));
        Ok(LoadOutcome::Applied(summary))
    }

    /// Synchronous load of an already-resolved document.
    pub fn load_document(&mut self, doc: RecordingDocument) -> Result<LoadOutcome> {
        let token = self.begin_load();
        let prepared = LoadedRecording::prepare(doc).map_err(TelemetryError::from);
        self.complete_load(token, prepared)
    }

    // =======================
    // Readiness
    // =======================

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    /// A load has been started and has not settled yet.
    pub fn is_loading(&self) -> bool {
        self.issued_generation > self.settled_generation
    }

    pub fn loaded(&self) -> Option<&LoadedRecording> {
        match &self.readiness {
            Readiness::Ready(loaded) => Some(loaded.as_ref()),
            _ => None,
        }
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.loaded().map(LoadedRecording::recording)
    }

    fn require_recording(&self) -> Result<&Recording> {
        self.recording().ok_or(TelemetryError::NotReady)
    }

    /// Bounds of a loaded, non-empty recording.
    fn require_bounds(&self) -> Result<SecondBounds> {
        self.require_recording()?
            .bounds()
            .ok_or(TelemetryError::EmptyRecording)
    }

    fn summary(&self) -> Option<RecordingSummary> {
        let loaded = self.loaded()?;
        let recording = &loaded.recording;
        Some(RecordingSummary {
            id: loaded.id,
            generation: self.committed_generation,
            entries: recording.len(),
            bounds: recording.bounds(),
            start_time: recording.start_time_string(),
            end_time: recording.end_time_string(),
            total_seconds: recording.total_seconds,
            label_count: recording.label_count,
            labels: recording.label_titles(),
            digital_sensors: recording.digital_sensor_names.clone(),
        })
    }

    pub fn status(&self) -> EngineStatus {
        let (state, error) = match &self.readiness {
            Readiness::NotLoaded => ("notLoaded", None),
            Readiness::Loading => ("loading", None),
            Readiness::Ready(_) => ("ready", None),
            Readiness::Failed(e) => ("failed", Some(e.to_string())),
        };
        EngineStatus {
            state,
            loading: self.is_loading(),
            error,
            recording: self.summary(),
        }
    }

    // =======================
    // Lookup
    // =======================

    pub fn lookup(&self, second: u32) -> Option<&Entry> {
        self.loaded()?.lookup(second)
    }

    /// Accepts an RFC 3339 timestamp, or `HH:MM:SS` / `MM:SS` elapsed time.
    pub fn lookup_time(&self, text: &str) -> Option<&Entry> {
        let text = text.trim();
        let second = match DateTime::parse_from_rfc3339(text) {
            Ok(ts) => self.recording()?.second_at(ts.with_timezone(&Utc))?,
            Err(_) => parse_clock_offset(text)?,
        };
        self.lookup(second)
    }

    pub fn label_titles(&self) -> Vec<String> {
        self.recording()
            .map(Recording::label_titles)
            .unwrap_or_default()
    }

    pub fn entries_in_range(&self, start: u32, end: u32) -> Result<Vec<&Entry>> {
        Ok(self.require_recording()?.entries_in_range(start, end).collect())
    }

    /// Entries inside the trim window. Separate from `chart_series`, which
    /// always projects the whole recording.
    pub fn trimmed_entries(&self) -> Result<Vec<&Entry>> {
        let window = self.trim_window()?;
        self.entries_in_range(window.trim_start, window.trim_end)
    }

    pub fn route(&self) -> Result<Vec<GeoPoint>> {
        Ok(self.require_recording()?.route())
    }

    // =======================
    // Playback
    // =======================

    pub fn playback(&self) -> Result<PlaybackState> {
        self.require_bounds()?;
        Ok(self.clock.state())
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// No-op (false) when already playing or when there is nothing to play.
    pub fn play(&mut self) -> bool {
        let started = self.clock.play(self.time.now());
        if started {
            info!("Playback started at second {}", self.clock.current_second());
            self.emit(EngineEvent::Playback(self.clock.state()));
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.clock.pause();
        if paused {
            info!("Playback paused at second {}", self.clock.current_second());
            self.emit(EngineEvent::Playback(self.clock.state()));
        }
        paused
    }

    pub fn seek(&mut self, second: i64) -> Result<u32> {
        self.require_bounds()?;
        let current = self
            .clock
            .seek(second)
            .ok_or(TelemetryError::EmptyRecording)?;
        self.emit(EngineEvent::Playback(self.clock.state()));
        Ok(current)
    }

    /// Cooperative tick, driven by the service's frame loop.
    pub fn tick(&mut self) -> Option<u32> {
        let advanced = self.clock.tick(self.time.now());
        if advanced.is_some() {
            self.emit(EngineEvent::Playback(self.clock.state()));
        }
        advanced
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        if !self.is_ready() {
            return None;
        }
        self.lookup(self.clock.current_second())
    }

    pub fn current_labels(&self) -> &[LabelSnapshot] {
        self.current_entry()
            .map(|e| e.labels.as_slice())
            .unwrap_or(&[])
    }

    pub fn current_position(&self) -> Option<GeoPoint> {
        self.current_entry().and_then(Entry::position)
    }

    // =======================
    // Trim window
    // =======================

    pub fn trim_window(&self) -> Result<TrimWindow> {
        self.require_bounds()?;
        self.trim.window().ok_or(TelemetryError::EmptyRecording)
    }

    pub fn set_trim_start(&mut self, second: i64) -> Result<TrimWindow> {
        self.require_bounds()?;
        let window = self
            .trim
            .set_start(second)
            .ok_or(TelemetryError::EmptyRecording)?;
        self.emit(EngineEvent::Trim(window));
        Ok(window)
    }

    pub fn set_trim_end(&mut self, second: i64) -> Result<TrimWindow> {
        self.require_bounds()?;
        let window = self
            .trim
            .set_end(second)
            .ok_or(TelemetryError::EmptyRecording)?;
        self.emit(EngineEvent::Trim(window));
        Ok(window)
    }

    // =======================
    // Visibility and projection
    // =======================

    pub fn visibility(&self) -> &VisibilitySet {
        &self.visibility
    }

    pub fn set_visibility<I, S>(&mut self, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let visibility: VisibilitySet = titles.into_iter().collect();
        if visibility == self.visibility {
            return;
        }
        self.visibility = visibility;
        self.series_cache = None;
        self.emit(EngineEvent::Visibility {
            titles: self.visibility.titles().to_vec(),
        });
    }

    /// Series for the visible labels over the whole recording. Cached until
    /// the recording or the visibility set changes.
    pub fn chart_series(&mut self) -> Result<Arc<Vec<ChartSeries>>> {
        if let Some(cached) = &self.series_cache {
            return Ok(cached.clone());
        }

        let recording = self.require_recording()?;
        let series = if recording.is_empty() {
            Vec::new()
        } else {
            project(&recording.entries, &self.visibility).map_err(|e| {
                warn!("Projection failed: {}", e);
                TelemetryError::from(e)
            })?
        };

        let series = Arc::new(series);
        self.series_cache = Some(series.clone());
        Ok(series)
    }
}

/// `HH:MM:SS` or `MM:SS` to elapsed seconds.
pub fn parse_clock_offset(text: &str) -> Option<u32> {
    let parts = text
        .split(':')
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualTimeSource;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn doc(json: &str) -> RecordingDocument {
        serde_json::from_str(json).unwrap()
    }

    fn three_seconds() -> RecordingDocument {
        doc(r#"{"startTime":"2025-11-01T00:00:00Z","data":[
            {"second":0,"timestamp":"2025-11-01T00:00:00Z","latitude":28.6,"longitude":77.2,
             "label":[{"title":"Sensor 1","maxValue":20,"minValue":0,"avgValue":10,"chartType":"analog"}]},
            {"second":1,"timestamp":"2025-11-01T00:00:01Z","latitude":28.7,"longitude":77.3,
             "label":[{"title":"Sensor 1","maxValue":40,"minValue":0,"avgValue":20,"chartType":"analog"}]},
            {"second":2,"timestamp":"2025-11-01T00:00:02Z","latitude":0,"longitude":0,
             "label":[{"title":"Sensor 1","maxValue":60,"minValue":0,"avgValue":30,"chartType":"analog"}]}
        ]}"#)
    }

    fn engine() -> (TelemetryEngine, ManualTimeSource) {
        let time = ManualTimeSource::new();
        (TelemetryEngine::new(Arc::new(time.clone())), time)
    }

    #[test]
    fn test_queries_before_load_are_not_ready() {
        let (mut engine, _) = engine();

        assert!(matches!(engine.readiness(), Readiness::NotLoaded));
        assert!(engine.lookup(0).is_none());
        assert_eq!(engine.playback(), Err(TelemetryError::NotReady));
        assert_eq!(engine.trim_window(), Err(TelemetryError::NotReady));
        assert_eq!(engine.seek(3), Err(TelemetryError::NotReady));
        assert_eq!(engine.chart_series(), Err(TelemetryError::NotReady));
        assert!(!engine.play());
        assert!(engine.current_labels().is_empty());
        assert_eq!(engine.status().state, "notLoaded");
    }

    #[test]
    fn test_three_second_scenario() {
        let (mut engine, _) = engine();
        let outcome = engine.load_document(three_seconds()).unwrap();

        let LoadOutcome::Applied(summary) = outcome else {
            panic!("load was not applied");
        };
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.bounds, Some(SecondBounds { start: 0, end: 2 }));
        assert_eq!(summary.labels, vec!["Sensor 1"]);

        engine.set_visibility(["Sensor 1"]);
        let series = engine.chart_series().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Sensor 1");
        let points: Vec<(u32, f64)> = series[0].points.iter().map(|p| (p.second, p.avg_value)).collect();
        assert_eq!(points, vec![(0, 10.0), (1, 20.0), (2, 30.0)]);
    }

    #[test]
    fn test_empty_recording() {
        let (mut engine, _) = engine();
        engine.load_document(doc(r#"{"data":[]}"#)).unwrap();

        assert!(engine.is_ready());
        assert!(engine.lookup(0).is_none());
        assert_eq!(engine.chart_series().unwrap().len(), 0);
        assert!(!engine.play());
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.playback(), Err(TelemetryError::EmptyRecording));
        assert_eq!(engine.trim_window(), Err(TelemetryError::EmptyRecording));
    }

    #[test]
    fn test_load_resets_clock_and_trim() {
        let (mut engine, time) = engine();
        engine.load_document(three_seconds()).unwrap();

        engine.seek(2).unwrap();
        engine.set_trim_start(1).unwrap();
        engine.play();
        time.advance(Duration::from_secs(1));
        engine.tick();

        engine.load_document(three_seconds()).unwrap();
        assert_eq!(
            engine.playback().unwrap(),
            PlaybackState {
                current_second: 0,
                is_playing: false
            }
        );
        assert_eq!(
            engine.trim_window().unwrap(),
            TrimWindow {
                trim_start: 0,
                trim_end: 2
            }
        );
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let (mut engine, _) = engine();

        let first = engine.begin_load();
        let second = engine.begin_load();

        let newer = LoadedRecording::prepare(three_seconds()).unwrap();
        let newer_id = newer.id();
        assert!(matches!(
            engine.complete_load(second, Ok(newer)),
            Ok(LoadOutcome::Applied(_))
        ));

        // The older fetch resolves last and must not win
        let older = LoadedRecording::prepare(doc(r#"{"data":[]}"#)).unwrap();
        assert_eq!(
            engine.complete_load(first, Ok(older)),
            Ok(LoadOutcome::Superseded { generation: 1 })
        );
        assert_eq!(engine.loaded().map(|l| l.id()), Some(newer_id));
        assert_eq!(engine.recording().map(|r| r.len()), Some(3));
        assert!(!engine.is_loading());
    }

    #[test]
    fn test_failed_load_keeps_previous_recording() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();

        let bad = doc(r#"{"data":[{"timestamp":"2025-11-01T00:00:00Z","latitude":1,"longitude":1,"label":[]}]}"#);
        let err = engine.load_document(bad).unwrap_err();

        assert!(matches!(err, TelemetryError::Schema(SchemaError::MissingField { .. })));
        assert!(engine.is_ready());
        assert_eq!(engine.recording().map(|r| r.len()), Some(3));
    }

    #[test]
    fn test_failed_first_load_reports_failure() {
        let (mut engine, _) = engine();
        let token = engine.begin_load();
        assert!(matches!(engine.readiness(), Readiness::Loading));
        assert!(engine.is_loading());

        let failure = TelemetryError::Load(crate::core::error::LoadError::Http("timeout".into()));
        assert!(engine.complete_load(token, Err(failure)).is_err());

        assert!(matches!(engine.readiness(), Readiness::Failed(_)));
        assert_eq!(engine.status().state, "failed");
        assert!(engine.lookup(0).is_none());
    }

    #[test]
    fn test_idempotent_reload() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();
        let first: Vec<Option<Entry>> = (0..5).map(|s| engine.lookup(s).cloned()).collect();

        engine.load_document(three_seconds()).unwrap();
        let second: Vec<Option<Entry>> = (0..5).map(|s| engine.lookup(s).cloned()).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_series_cache_follows_visibility() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();

        assert!(engine.chart_series().unwrap().is_empty());
        engine.set_visibility(["Sensor 1"]);
        assert_eq!(engine.chart_series().unwrap().len(), 1);

        engine.set_visibility(["Sensor 9"]);
        assert!(matches!(
            engine.chart_series(),
            Err(TelemetryError::Schema(SchemaError::MissingLabel { .. }))
        ));
    }

    #[test]
    fn test_projection_ignores_trim_window() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();
        engine.set_visibility(["Sensor 1"]);
        engine.set_trim_start(1).unwrap();
        engine.set_trim_end(1).unwrap();

        assert_eq!(engine.chart_series().unwrap()[0].points.len(), 3);
        let trimmed: Vec<u32> = engine.trimmed_entries().unwrap().iter().map(|e| e.second).collect();
        assert_eq!(trimmed, vec![1]);
    }

    #[test]
    fn test_playback_through_engine() {
        let (mut engine, time) = engine();
        engine.load_document(three_seconds()).unwrap();
        let mut events = engine.subscribe();

        assert!(engine.play());
        for _ in 0..50 {
            time.advance(Duration::from_millis(100));
            engine.tick();
        }

        let state = engine.playback().unwrap();
        assert_eq!(state.current_second, 2);
        assert!(state.is_playing);
        assert_eq!(engine.current_labels()[0].avg_value, 30.0);
        // Second 2 has no position fix
        assert_eq!(engine.current_position(), None);

        let mut seconds = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::Playback(state) = event {
                seconds.push(state.current_second);
            }
        }
        assert_eq!(seconds, vec![0, 1, 2]);
    }

    #[test]
    fn test_lookup_time() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();

        assert_eq!(engine.lookup_time("00:00:02").map(|e| e.second), Some(2));
        assert_eq!(engine.lookup_time("00:01").map(|e| e.second), Some(1));
        assert_eq!(
            engine.lookup_time("2025-11-01T00:00:01Z").map(|e| e.second),
            Some(1)
        );
        assert!(engine.lookup_time("2025-11-01T05:00:00Z").is_none());
        assert!(engine.lookup_time("noon").is_none());
    }

    #[test]
    fn test_route_skips_missing_fix() {
        let (mut engine, _) = engine();
        engine.load_document(three_seconds()).unwrap();
        assert_eq!(engine.route().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_clock_offset() {
        assert_eq!(parse_clock_offset("01:02:03"), Some(3723));
        assert_eq!(parse_clock_offset("02:03"), Some(123));
        assert_eq!(parse_clock_offset("3"), None);
        assert_eq!(parse_clock_offset("a:b"), None);
    }
}
