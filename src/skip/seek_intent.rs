use std::time::Duration;

use tokio::time::Instant;

use super::timers::{SessionTimers, TimerId, TimerTask};
use crate::config::SkipperConfig;

/// Positions within this many seconds of a controller-issued target are
/// attributed to the controller.
const TARGET_TOLERANCE_SECS: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// The controller moved the clock itself.
    Programmatic,
    /// A person dragged the scrubber, clicked the bar, or used a hotkey.
    Manual,
}

#[derive(Debug, Clone, Copy)]
struct ExpectedSeek {
    target: f64,
    issued_at: Instant,
}

/// Tells manual seeks apart from the controller's own jumps and tracks the
/// grace period that follows a manual seek.
#[derive(Debug)]
pub struct SeekIntentTracker {
    manual: bool,
    last_manual_seek_at: Option<Instant>,
    pending_clear: Option<TimerId>,
    /// Controller jumps whose seek events have not all arrived. A chained skip
    /// issues the next jump before the previous one's seek-end.
    expected: Vec<ExpectedSeek>,
    debounce: Duration,
    grace_period: Duration,
    expectation_window: Duration,
}

impl SeekIntentTracker {
    pub fn new(config: &SkipperConfig) -> Self {
        Self {
            manual: false,
            last_manual_seek_at: None,
            pending_clear: None,
            expected: Vec::new(),
            debounce: config.seek_debounce,
            grace_period: config.grace_period,
            expectation_window: config.programmatic_seek_window,
        }
    }

    pub fn is_manual_seek_in_progress(&self) -> bool {
        self.manual
    }

    pub fn is_within_grace_period(&self, now: Instant) -> bool {
        self.last_manual_seek_at
            .map(|at| now.saturating_duration_since(at) < self.grace_period)
            .unwrap_or(false)
    }

    pub fn last_manual_seek_at(&self) -> Option<Instant> {
        self.last_manual_seek_at
    }

    /// Note that the controller is about to move the clock to `target`, so the
    /// seek events it causes are not mistaken for a person.
    pub fn record_programmatic_seek(&mut self, target: f64, now: Instant) {
        self.forget_stale_expectations(now);
        self.expected.push(ExpectedSeek {
            target,
            issued_at: now,
        });
    }

    pub fn on_seek_start(
        &mut self,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> SeekOrigin {
        if self.match_expected(position, now).is_some() {
            return SeekOrigin::Programmatic;
        }

        self.expected.clear();
        self.manual = true;
        self.last_manual_seek_at = Some(now);
        if let Some(id) = self.pending_clear.take() {
            timers.cancel(id);
        }
        SeekOrigin::Manual
    }

    pub fn on_seek_end(
        &mut self,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> SeekOrigin {
        if let Some(index) = self.match_expected(position, now) {
            self.expected.remove(index);
            return SeekOrigin::Programmatic;
        }

        // Seek-end alone still counts; some players skip the start event on
        // keyboard seeks.
        self.expected.clear();
        self.manual = true;
        self.last_manual_seek_at = Some(now);
        if let Some(id) = self.pending_clear.take() {
            timers.cancel(id);
        }
        self.pending_clear = Some(timers.schedule(now + self.debounce, TimerTask::ClearManualSeek));
        SeekOrigin::Manual
    }

    /// Debounce timer fired. Ignored unless it is the most recent one.
    pub fn on_debounce_elapsed(&mut self, id: TimerId) -> bool {
        if self.pending_clear != Some(id) {
            return false;
        }
        self.pending_clear = None;
        self.manual = false;
        true
    }

    pub fn reset(&mut self, timers: &mut SessionTimers<'_>) {
        if let Some(id) = self.pending_clear.take() {
            timers.cancel(id);
        }
        self.manual = false;
        self.last_manual_seek_at = None;
        self.expected.clear();
    }

    /// Index of the pending controller jump that explains a seek to `position`.
    fn match_expected(&mut self, position: f64, now: Instant) -> Option<usize> {
        self.forget_stale_expectations(now);
        self.expected
            .iter()
            .position(|expected| (position - expected.target).abs() <= TARGET_TOLERANCE_SECS)
    }

    fn forget_stale_expectations(&mut self, now: Instant) {
        let window = self.expectation_window;
        self.expected
            .retain(|expected| now.saturating_duration_since(expected.issued_at) <= window);
    }
}
