//! Timeline replay driven by a periodic tokio task.
//!
//! At most one replay runs at a time. Every start or stop bumps a generation
//! counter kept under the state lock, and a tick only mutates the timeline
//! while its generation is still current, so a tick racing with a stop is
//! dropped instead of moving the cursor.

use crate::state::AppState;
use flowchat_core::{PlaybackClock, PlaybackConfig, PlaybackTick};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of toggling playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackToggle {
    Started,
    Stopped,
}

/// The single playback resource of the application.
#[derive(Debug, Default)]
pub(crate) struct PlaybackSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl PlaybackSlot {
    pub fn is_playing(&self) -> bool {
        self.token.is_some()
    }

    /// Starts a new run and returns its generation and cancellation token.
    pub fn start(&mut self) -> (u64, CancellationToken) {
        self.stop();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        (self.generation, token)
    }

    /// Stops the current run, if any. Idempotent.
    pub fn stop(&mut self) {
        self.generation += 1;
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.token.is_some() && self.generation == generation
    }
}

/// Ticks the active timeline from 0.0 to 1.0.
pub(crate) async fn run_playback(
    state: Arc<RwLock<AppState>>,
    config: PlaybackConfig,
    generation: u64,
    token: CancellationToken,
) {
    let mut ticker = interval(config.tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    let mut clock = PlaybackClock::new(config.step);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut state = state.write().await;
        if !state.playback.is_current(generation) {
            break;
        }
        let Some(view) = state.view.as_mut() else {
            state.playback.stop();
            break;
        };

        match clock.tick() {
            PlaybackTick::Advanced(position) => {
                view.timeline.set_position(position);
            }
            PlaybackTick::Finished => {
                view.timeline.set_position(1.0);
                state.playback.stop();
                debug!(ticks = clock.ticks(), "Playback finished");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_generations() {
        let mut slot = PlaybackSlot::default();
        assert!(!slot.is_playing());

        let (first, first_token) = slot.start();
        assert!(slot.is_current(first));

        let (second, _) = slot.start();
        assert!(first_token.is_cancelled());
        assert!(!slot.is_current(first));
        assert!(slot.is_current(second));

        slot.stop();
        assert!(!slot.is_playing());
        assert!(!slot.is_current(second));
        slot.stop();
    }
}
