// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incoming-call popup: `hidden -> scheduled -> shown -> hidden`.
//!
//! Both timers (show delay and auto-decline) run as spawned tasks guarded by
//! a cancellation token and a generation number. `hide()` cancels whichever
//! is pending and bumps the generation, so a timer that already woke up
//! finds itself stale and does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chime::ChimeScheduler;
use crate::options::AutoIncomingCallOptions;
use crate::scheduler::NotificationScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PopupPhase {
    Hidden,
    Scheduled,
    Shown,
}

/// How a shown popup was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PopupOutcome {
    Accepted,
    Declined,
    TimedOut,
}

pub trait PopupObserver: Send + Sync {
    fn on_shown(&self) {}
    fn on_outcome(&self, outcome: PopupOutcome);
}

struct PopupState {
    phase: PopupPhase,
    generation: u64,
    timer: Option<CancellationToken>,
}

impl PopupState {
    /// Cancel any pending timer and invalidate any that already fired.
    fn disarm(&mut self) {
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct PopupInner {
    options: AutoIncomingCallOptions,
    scheduler: NotificationScheduler,
    chime: Arc<ChimeScheduler>,
    observers: Mutex<Vec<Arc<dyn PopupObserver>>>,
    state: Mutex<PopupState>,
}

/// Cloneable handle; clones share one popup.
#[derive(Clone)]
pub struct IncomingCallPopup {
    inner: Arc<PopupInner>,
}

impl IncomingCallPopup {
    pub fn new(
        options: AutoIncomingCallOptions,
        scheduler: NotificationScheduler,
        chime: Arc<ChimeScheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(PopupInner {
                options,
                scheduler,
                chime,
                observers: Mutex::new(Vec::new()),
                state: Mutex::new(PopupState {
                    phase: PopupPhase::Hidden,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn PopupObserver>) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn phase(&self) -> PopupPhase {
        self.state().phase
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.inner.scheduler
    }

    /// Arm the show timer if the popup is enabled and the interaction
    /// history allows it. Must be called inside a tokio runtime.
    pub fn start(&self) -> bool {
        if !self.inner.options.enabled {
            return false;
        }
        if !self.inner.scheduler.should_show(Utc::now()) {
            info!("incoming call skipped based on interaction history");
            return false;
        }

        let (token, generation) = {
            let mut state = self.state();
            if state.phase != PopupPhase::Hidden {
                return false;
            }
            state.disarm();
            state.phase = PopupPhase::Scheduled;
            let token = CancellationToken::new();
            state.timer = Some(token.clone());
            (token, state.generation)
        };

        let delay = self.inner.options.delay();
        debug!(delay_ms = delay.as_millis() as u64, "incoming call scheduled");
        let popup = self.clone();
        spawn_timer(token, delay, move || {
            popup.show_if(Some(generation));
        });
        true
    }

    /// Show now. Ignored if already shown.
    pub fn show(&self) -> bool {
        self.show_if(None)
    }

    /// Show, provided the popup is still in the scheduled generation
    /// `expected` (when given). The check and the transition share one lock.
    fn show_if(&self, expected: Option<u64>) -> bool {
        let armed = {
            let mut state = self.state();
            if state.phase == PopupPhase::Shown {
                return false;
            }
            if let Some(generation) = expected
                && (state.generation != generation || state.phase != PopupPhase::Scheduled)
            {
                return false;
            }
            state.disarm();
            state.phase = PopupPhase::Shown;
            self.inner.chime.start_repeating();
            self.inner.options.timeout().map(|timeout| {
                let token = CancellationToken::new();
                state.timer = Some(token.clone());
                (token, state.generation, timeout)
            })
        };

        self.inner
            .scheduler
            .store()
            .record_notification_shown(Utc::now());

        if let Some((token, generation, timeout)) = armed {
            let popup = self.clone();
            spawn_timer(token, timeout, move || {
                popup.finish(PopupOutcome::TimedOut, Some(generation));
            });
        }

        info!("incoming call shown");
        for observer in self.observers() {
            observer.on_shown();
        }
        true
    }

    /// User accepted. Returns false unless the popup was showing.
    pub fn accept(&self) -> bool {
        self.finish(PopupOutcome::Accepted, None)
    }

    /// User declined. Returns false unless the popup was showing.
    pub fn decline(&self) -> bool {
        self.finish(PopupOutcome::Declined, None)
    }

    /// Cancel both timers, silence the chime and go hidden.
    pub fn hide(&self) {
        {
            let mut state = self.state();
            state.disarm();
            state.phase = PopupPhase::Hidden;
            self.inner.chime.stop();
        }
    }

    pub fn destroy(&self) {
        self.hide();
        self.inner.chime.dispose();
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Leave `Shown` with `outcome`. Only one caller can win the transition;
    /// the winner records the outcome and notifies observers.
    fn finish(&self, outcome: PopupOutcome, expected: Option<u64>) -> bool {
        {
            let mut state = self.state();
            if state.phase != PopupPhase::Shown
                || expected.is_some_and(|generation| generation != state.generation)
            {
                return false;
            }
            state.disarm();
            state.phase = PopupPhase::Hidden;
            self.inner.chime.stop();
        }

        let now = Utc::now();
        let store = self.inner.scheduler.store();
        match outcome {
            PopupOutcome::Accepted => store.record_accepted(now),
            PopupOutcome::Declined | PopupOutcome::TimedOut => store.record_declined(now),
        };

        info!(%outcome, "incoming call dismissed");
        for observer in self.observers() {
            observer.on_outcome(outcome);
        }
        true
    }

    fn observers(&self) -> Vec<Arc<dyn PopupObserver>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn state(&self) -> MutexGuard<'_, PopupState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn spawn_timer<F>(token: CancellationToken, after: Duration, fire: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(after) => fire(),
        }
    });
}
