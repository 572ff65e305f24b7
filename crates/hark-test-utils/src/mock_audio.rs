// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chime output.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use hark_core::HarkError;
use hark_widget::ChimePlayer;

/// Records every chime instead of playing it.
#[derive(Default)]
pub struct MockChimePlayer {
    volumes: Mutex<Vec<f32>>,
    stops: AtomicUsize,
    closes: AtomicUsize,
    system_volume: Mutex<Option<f32>>,
    broken: AtomicBool,
}

impl MockChimePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this system volume to the chime scheduler.
    pub fn with_system_volume(volume: f32) -> Self {
        let player = Self::default();
        *player.system_volume.lock().unwrap() = Some(volume);
        player
    }

    /// Make every play fail, as if no audio output were available.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub fn play_count(&self) -> usize {
        self.volumes.lock().unwrap().len()
    }

    /// Volumes of each play, in order.
    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ChimePlayer for MockChimePlayer {
    fn play(&self, volume: f32, _max_duration: Duration) -> Result<(), HarkError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(HarkError::Internal("no audio output".into()));
        }
        self.volumes.lock().unwrap().push(volume);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn system_volume(&self) -> Option<f32> {
        *self.system_volume.lock().unwrap()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
