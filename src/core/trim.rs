// Trim window: a user-selected sub-range of the recording's seconds

use crate::core::format::SecondBounds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimWindow {
    pub trim_start: u32,
    pub trim_end: u32,
}

/// Holds the window together with the bounds it is clamped against.
/// Invariant: `bounds.start <= trim_start <= trim_end <= bounds.end`.
#[derive(Debug, Clone, Default)]
pub struct TrimState {
    bounds: Option<SecondBounds>,
    window: Option<TrimWindow>,
}

impl TrimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both edges snap to the full bounds.
    pub fn reset(&mut self, bounds: Option<SecondBounds>) {
        self.bounds = bounds;
        self.window = bounds.map(|b| TrimWindow {
            trim_start: b.start,
            trim_end: b.end,
        });
    }

    pub fn window(&self) -> Option<TrimWindow> {
        self.window
    }

    pub fn set_start(&mut self, second: i64) -> Option<TrimWindow> {
        let bounds = self.bounds?;
        let window = self.window.as_mut()?;
        window.trim_start = bounds.clamp(second).min(window.trim_end);
        Some(*window)
    }

    pub fn set_end(&mut self, second: i64) -> Option<TrimWindow> {
        let bounds = self.bounds?;
        let window = self.window.as_mut()?;
        window.trim_end = bounds.clamp(second).max(window.trim_start);
        Some(*window)
    }
}
