//! Timeline cursor and replay stepping.
//!
//! The cursor is a normalized position over the conversation's creation
//! order. Visibility is a temporal cut evaluated against the live message
//! count, so appending messages can grow the visible set while the cursor
//! stays put.

use std::time::Duration;

/// Fraction of the full range advanced per playback tick.
pub const PLAYBACK_STEP: f64 = 0.02;

/// Period between playback ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Timing parameters of the replay animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub tick_period: Duration,
    pub step: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            step: PLAYBACK_STEP,
        }
    }
}

impl PlaybackConfig {
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }
}

/// Clamps a raw position into `[0.0, 1.0]`. NaN maps to `0.0`.
pub fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    }
}

/// `floor(position * total)`, clamped to `[0, total]`.
pub fn visible_count(total: usize, position: f64) -> usize {
    let position = clamp_position(position);
    if position >= 1.0 {
        return total;
    }
    let count = (position * total as f64).floor();
    (count as usize).min(total)
}

/// Whether the message at `ordered_index` (creation order) is visible.
pub fn is_visible(ordered_index: usize, position: f64, total: usize) -> bool {
    ordered_index < visible_count(total, position)
}

/// The timeline cursor of one conversation. Starts at 1.0 (everything visible).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    position: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self { position: 1.0 }
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Stores `position` clamped into `[0.0, 1.0]` and returns the stored value.
    pub fn set_position(&mut self, position: f64) -> f64 {
        self.position = clamp_position(position);
        self.position
    }

    pub fn visible_count(&self, total: usize) -> usize {
        visible_count(total, self.position)
    }

    pub fn is_visible(&self, ordered_index: usize, total: usize) -> bool {
        is_visible(ordered_index, self.position, total)
    }

    pub fn shows_everything(&self) -> bool {
        self.position >= 1.0
    }
}

/// Outcome of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackTick {
    /// The cursor moved to the given position and playback continues.
    Advanced(f64),
    /// The cursor reached 1.0; playback must stop.
    Finished,
}

/// Pure stepping logic of the replay animation.
///
/// Positions are derived from the tick count rather than accumulated, so
/// after `k` ticks the position is exactly `min(1.0, k * step)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    ticks: u32,
    ticks_to_end: u32,
    step: f64,
}

impl PlaybackClock {
    pub fn new(step: f64) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step.min(1.0)
        } else {
            PLAYBACK_STEP
        };
        let ticks_to_end = ((1.0 / step) - 1e-9).ceil().max(1.0) as u32;
        Self {
            ticks: 0,
            ticks_to_end,
            step,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn position(&self) -> f64 {
        if self.is_finished() {
            1.0
        } else {
            (f64::from(self.ticks) * self.step).min(1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ticks >= self.ticks_to_end
    }

    /// Advances one step. Once finished, further ticks stay at 1.0.
    pub fn tick(&mut self) -> PlaybackTick {
        if self.is_finished() {
            return PlaybackTick::Finished;
        }
        self.ticks += 1;
        if self.is_finished() {
            PlaybackTick::Finished
        } else {
            PlaybackTick::Advanced(self.position())
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(PLAYBACK_STEP)
    }
}
