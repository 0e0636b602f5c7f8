// Playback clock driven by an injected time source

use crate::core::constants::ADVANCE_PERIOD;
use crate::core::format::SecondBounds;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Monotonic time measured from an arbitrary origin.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Duration;
}

/// Runtime time source. Uses tokio's clock so paused-time tests drive it too.
#[derive(Debug, Clone)]
pub struct TokioTimeSource {
    origin: tokio::time::Instant,
}

impl TokioTimeSource {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time source. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_second: u32,
    pub is_playing: bool,
}

/// A virtual current second that advances by one unit for every real second
/// of play time. It never reads a wall clock; every transition that needs
/// time is handed `now` from a [`TimeSource`].
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    bounds: Option<SecondBounds>,
    current: u32,
    playing: bool,
    /// Time of the last committed advance, or of `play()` if none yet.
    last_advance: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-initialize for a freshly loaded recording: stopped, at the start.
    pub fn reset(&mut self, bounds: Option<SecondBounds>) {
        self.bounds = bounds;
        self.current = bounds.map(|b| b.start).unwrap_or(0);
        self.playing = false;
        self.last_advance = Duration::ZERO;
    }

    pub fn bounds(&self) -> Option<SecondBounds> {
        self.bounds
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_second: self.current,
            is_playing: self.playing,
        }
    }

    pub fn current_second(&self) -> u32 {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Returns true when the clock went from stopped to playing. A clock
    /// without bounds (nothing loaded, or zero entries) never starts.
    pub fn play(&mut self, now: Duration) -> bool {
        if self.playing || self.bounds.is_none() {
            return false;
        }
        self.playing = true;
        self.last_advance = now;
        true
    }

    /// Returns true when the clock went from playing to stopped.
    pub fn pause(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.playing = false;
        true
    }

    /// Moves the cursor, clamped to the bounds. Play state is untouched.
    pub fn seek(&mut self, second: i64) -> Option<u32> {
        let bounds = self.bounds?;
        self.current = bounds.clamp(second);
        Some(self.current)
    }

    /// One cooperative scheduling opportunity. Commits at most one second per
    /// call. The sub-second remainder of a late frame carries over to the
    /// next measurement; a backlog of a whole second or more is dropped.
    ///
    /// Returns the new current second when it changed.
    pub fn tick(&mut self, now: Duration) -> Option<u32> {
        if !self.playing {
            return None;
        }
        let bounds = self.bounds?;

        let elapsed = now.saturating_sub(self.last_advance);
        if elapsed < ADVANCE_PERIOD {
            return None;
        }

        self.last_advance = if elapsed < ADVANCE_PERIOD * 2 {
            self.last_advance + ADVANCE_PERIOD
        } else {
            now
        };

        let next = self.current.saturating_add(1).min(bounds.end);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_100MS: Duration = Duration::from_millis(100);

    fn clock(start: u32, end: u32) -> PlaybackClock {
        let mut clock = PlaybackClock::new();
        clock.reset(Some(SecondBounds { start, end }));
        clock
    }

    fn run(clock: &mut PlaybackClock, time: &ManualTimeSource, frame: Duration, frames: u32) {
        for _ in 0..frames {
            time.advance(frame);
            clock.tick(time.now());
        }
    }

    #[test]
    fn test_initial_state_is_stopped_at_start() {
        let clock = clock(5, 20);
        assert_eq!(
            clock.state(),
            PlaybackState {
                current_second: 5,
                is_playing: false
            }
        );
    }

    #[test]
    fn test_frame_split_does_not_change_result() {
        let time = ManualTimeSource::new();

        let mut fine = clock(0, 100);
        fine.play(time.now());
        run(&mut fine, &time, FRAME_100MS, 10);
        assert_eq!(fine.current_second(), 1);

        let time = ManualTimeSource::new();
        let mut coarse = clock(0, 100);
        coarse.play(time.now());
        run(&mut coarse, &time, Duration::from_secs(1), 1);
        assert_eq!(coarse.current_second(), 1);
    }

    #[test]
    fn test_uneven_frames_keep_pace() {
        let time = ManualTimeSource::new();
        let mut odd = clock(0, 100);
        odd.play(time.now());

        // 300ms frames do not divide a second; 30 frames are 9 real seconds
        run(&mut odd, &time, Duration::from_millis(300), 30);
        assert_eq!(odd.current_second(), 9);

        // 16ms frames: 625 frames are 10 real seconds
        let time = ManualTimeSource::new();
        let mut display = clock(0, 100);
        display.play(time.now());
        run(&mut display, &time, Duration::from_millis(16), 625);
        assert_eq!(display.current_second(), 10);
    }

    #[test]
    fn test_one_tick_never_advances_more_than_one() {
        let time = ManualTimeSource::new();
        let mut clock = clock(0, 100);
        clock.play(time.now());

        time.advance(Duration::from_secs(5));
        assert_eq!(clock.tick(time.now()), Some(1));
        assert_eq!(clock.tick(time.now()), None);

        // Backlog was dropped: the next advance needs another full second
        time.advance(Duration::from_millis(999));
        assert_eq!(clock.tick(time.now()), None);
        time.advance(Duration::from_millis(1));
        assert_eq!(clock.tick(time.now()), Some(2));
    }

    #[test]
    fn test_clamps_at_end_and_keeps_playing() {
        let time = ManualTimeSource::new();
        let mut clock = clock(0, 3);
        clock.play(time.now());

        run(&mut clock, &time, Duration::from_secs(1), 10);
        assert_eq!(clock.current_second(), 3);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_pause_stops_advancing_and_play_restarts_measurement() {
        let time = ManualTimeSource::new();
        let mut clock = clock(0, 100);
        clock.play(time.now());

        time.advance(Duration::from_millis(900));
        clock.tick(time.now());
        assert!(clock.pause());
        assert!(!clock.pause());

        run(&mut clock, &time, FRAME_100MS, 50);
        assert_eq!(clock.current_second(), 0);

        assert!(clock.play(time.now()));
        assert!(!clock.play(time.now()));
        // The 900ms measured before the pause does not count
        time.advance(Duration::from_millis(500));
        assert_eq!(clock.tick(time.now()), None);
        time.advance(Duration::from_millis(500));
        assert_eq!(clock.tick(time.now()), Some(1));
    }

    #[test]
    fn test_seek_clamps_in_both_states() {
        let mut clock = clock(10, 20);

        assert_eq!(clock.seek(15), Some(15));
        assert_eq!(clock.seek(-4), Some(10));
        assert_eq!(clock.seek(500), Some(20));
        assert!(!clock.is_playing());

        clock.play(Duration::ZERO);
        assert_eq!(clock.seek(12), Some(12));
        assert!(clock.is_playing());
    }

    #[test]
    fn test_unbounded_clock_is_inert() {
        let mut clock = PlaybackClock::new();
        clock.reset(None);

        assert!(!clock.play(Duration::ZERO));
        assert_eq!(clock.seek(3), None);
        assert_eq!(clock.tick(Duration::from_secs(10)), None);
        assert_eq!(clock.current_second(), 0);
    }
}
