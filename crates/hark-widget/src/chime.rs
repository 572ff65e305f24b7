// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incoming-call chime: one play on show, then one per repeat interval
//! until stopped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hark_core::HarkError;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::options::SoundOptions;

/// Audio output for the chime.
pub trait ChimePlayer: Send + Sync {
    /// Start one chime at `volume` (0.0 to 1.0), cut off after `max_duration`.
    fn play(&self, volume: f32, max_duration: Duration) -> Result<(), HarkError>;

    /// Stop a chime that is still sounding.
    fn stop(&self);

    /// Output volume reported by the platform, if known.
    fn system_volume(&self) -> Option<f32>;

    /// Release the output device.
    fn close(&self) {}
}

struct ChimeState {
    repeating: Option<CancellationToken>,
    disposed: bool,
}

/// Owns the chime's repeat timer. Created with the widget and disposed with it.
pub struct ChimeScheduler {
    options: SoundOptions,
    player: Arc<dyn ChimePlayer>,
    state: Mutex<ChimeState>,
}

impl ChimeScheduler {
    pub fn new(options: SoundOptions, player: Arc<dyn ChimePlayer>) -> Self {
        Self {
            options,
            player,
            state: Mutex::new(ChimeState {
                repeating: None,
                disposed: false,
            }),
        }
    }

    /// Configured volume, capped by the system volume when requested.
    pub fn effective_volume(&self) -> f32 {
        let volume = self.options.volume.clamp(0.0, 1.0);
        if self.options.respect_system_volume {
            match self.player.system_volume() {
                Some(system) => volume.min(system.clamp(0.0, 1.0)),
                None => volume,
            }
        } else {
            volume
        }
    }

    /// Play once. Returns whether a chime was started.
    pub fn play_once(&self) -> bool {
        if !self.options.enabled || self.lock().disposed {
            return false;
        }
        match self
            .player
            .play(self.effective_volume(), self.options.max_duration())
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "could not play notification chime");
                false
            }
        }
    }

    /// Play now and then every repeat interval until [`stop`](Self::stop).
    /// Ignored if already repeating.
    pub fn start_repeating(self: &Arc<Self>) {
        if !self.options.enabled {
            return;
        }
        let token = {
            let mut state = self.lock();
            if state.disposed || state.repeating.is_some() {
                return;
            }
            let token = CancellationToken::new();
            state.repeating = Some(token.clone());
            token
        };

        self.play_once();

        let Some(period) = self.options.repeat_interval() else {
            return;
        };
        let chime = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        chime.play_once();
                    }
                }
            }
            debug!("chime repeat stopped");
        });
    }

    pub fn is_repeating(&self) -> bool {
        self.lock().repeating.is_some()
    }

    /// Cancel the repeat timer and silence the current chime.
    pub fn stop(&self) {
        if let Some(token) = self.lock().repeating.take() {
            token.cancel();
        }
        self.player.stop();
    }

    /// Stop and release the output. Later calls are no-ops.
    pub fn dispose(&self) {
        self.stop();
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.disposed, true)
        };
        if first {
            self.player.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
        closes: AtomicUsize,
        volume: Mutex<Option<f32>>,
    }

    impl ChimePlayer for CountingPlayer {
        fn play(&self, volume: f32, _: Duration) -> Result<(), HarkError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            *self.volume.lock().unwrap() = Some(volume);
            Ok(())
        }
        fn stop(&self) {}
        fn system_volume(&self) -> Option<f32> {
            Some(0.1)
        }
        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn system_volume_caps_when_respected() {
        let player = Arc::new(CountingPlayer::default());
        let capped = ChimeScheduler::new(SoundOptions::default(), player.clone());
        assert_eq!(capped.effective_volume(), 0.1);

        let uncapped = ChimeScheduler::new(
            SoundOptions {
                respect_system_volume: false,
                ..SoundOptions::default()
            },
            player,
        );
        assert_eq!(uncapped.effective_volume(), 0.2);
    }

    #[test]
    fn disabled_sound_never_plays() {
        let player = Arc::new(CountingPlayer::default());
        let chime = ChimeScheduler::new(
            SoundOptions {
                enabled: false,
                ..SoundOptions::default()
            },
            player.clone(),
        );
        assert!(!chime.play_once());
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_on_interval_until_stopped() {
        let player = Arc::new(CountingPlayer::default());
        let chime = Arc::new(ChimeScheduler::new(SoundOptions::default(), player.clone()));

        chime.start_repeating();
        chime.start_repeating();
        assert_eq!(player.plays.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(player.plays.load(Ordering::SeqCst), 3);

        chime.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(player.plays.load(Ordering::SeqCst), 3);
        assert!(!chime.is_repeating());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_closes_once_and_blocks_restart() {
        let player = Arc::new(CountingPlayer::default());
        let chime = Arc::new(ChimeScheduler::new(SoundOptions::default(), player.clone()));
        chime.dispose();
        chime.dispose();
        chime.start_repeating();
        assert_eq!(player.closes.load(Ordering::SeqCst), 1);
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    }
}
