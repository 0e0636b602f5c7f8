// Async owner of a TelemetryEngine and its playback tick loop

use crate::core::constants::DEFAULT_FRAME_INTERVAL_MS;
use crate::core::engine::{EngineEvent, LoadOutcome, LoadedRecording, TelemetryEngine};
use crate::core::error::{LoadError, Result};
use crate::core::loader::RecordingSource;
use crate::core::scheduler::RepeatingTask;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Clone)]
pub struct TelemetryService {
    engine: Arc<Mutex<TelemetryEngine>>,
    ticker: Arc<Mutex<Option<RepeatingTask>>>,
    client: reqwest::Client,
    frame_interval: Duration,
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(TelemetryEngine::default())
    }
}

impl TelemetryService {
    pub fn new(engine: TelemetryEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: Arc::new(Mutex::new(None)),
            client: reqwest::Client::new(),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    /// Direct access for queries. Keep the guard short-lived; the tick loop
    /// needs the same lock every frame.
    pub async fn engine(&self) -> MutexGuard<'_, TelemetryEngine> {
        self.engine.lock().await
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.lock().await.subscribe()
    }

    /// Resolves, normalizes and indexes the source without holding the engine
    /// lock, then commits. A load that was overtaken by a newer one returns
    /// `Superseded` and changes nothing.
    pub async fn load(&self, source: &RecordingSource) -> Result<LoadOutcome> {
        let token = self.engine.lock().await.begin_load();
        info!(
            "Loading {} (generation {})",
            source.describe(),
            token.generation()
        );

        let prepared = self.prepare(source).await;

        // Ticker before engine, as in play(), so no play() lands between the
        // commit and the cancel
        let mut ticker = self.ticker.lock().await;
        let outcome = self.engine.lock().await.complete_load(token, prepared)?;

        if let LoadOutcome::Applied(_) = outcome {
            // The clock was reset to stopped; retire the old loop
            retire(&mut ticker).await;
        }
        Ok(outcome)
    }

    async fn prepare(&self, source: &RecordingSource) -> Result<LoadedRecording> {
        let doc = source.fetch(&self.client).await?;
        let prepared = tokio::task::spawn_blocking(move || LoadedRecording::prepare(doc))
            .await
            .map_err(|e| LoadError::Io(format!("Normalize task failed: {e}")))??;
        Ok(prepared)
    }

    /// Starts playback and the frame loop. Calling it while a loop is already
    /// running does not start a second one.
    pub async fn play(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        let (started, playing) = {
            let mut engine = self.engine.lock().await;
            (engine.play(), engine.is_playing())
        };

        if playing && ticker.as_ref().map_or(true, RepeatingTask::is_finished) {
            *ticker = Some(self.spawn_ticker());
            debug!("Tick loop started ({:?} frames)", self.frame_interval);
        }
        started
    }

    pub async fn pause(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        let paused = self.engine.lock().await.pause();
        retire(&mut ticker).await;
        paused
    }

    pub async fn seek(&self, second: i64) -> Result<u32> {
        self.engine.lock().await.seek(second)
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    fn spawn_ticker(&self) -> RepeatingTask {
        let engine = self.engine.clone();
        RepeatingTask::spawn(self.frame_interval, move || {
            let engine = engine.clone();
            async move {
                let mut engine = engine.lock().await;
                engine.tick();
                if engine.is_playing() {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        })
    }
}

async fn retire(ticker: &mut Option<RepeatingTask>) {
    if let Some(task) = ticker.take() {
        task.cancel().await;
        debug!("Tick loop cancelled");
    }
}
