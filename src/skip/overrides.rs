use std::{collections::HashMap, time::Duration};

use serde::Serialize;
use tokio::time::Instant;

use super::timers::{SessionTimers, TimerId, TimerTask};
use crate::models::IntervalKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideReason {
    /// A manual seek landed inside the interval.
    ManualSeek,
    /// The interval's marker was clicked.
    MarkerClick,
    /// Rewind-to-last-skip re-entered it.
    Rewind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverrideExpiry {
    At(Instant),
    /// Minimum watch is over but playback is still inside; cleared on exit.
    PinnedUntilExit,
}

#[derive(Debug, Clone, Copy)]
pub struct OverrideEntry {
    pub key: IntervalKey,
    pub reason: OverrideReason,
    pub expires: OverrideExpiry,
    recheck: Option<TimerId>,
}

impl OverrideEntry {
    fn minimum_watch_elapsed(&self, now: Instant) -> bool {
        match self.expires {
            OverrideExpiry::At(deadline) => now >= deadline,
            OverrideExpiry::PinnedUntilExit => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckOutcome {
    Cleared,
    Extended,
    /// Timer no longer matches a live entry.
    Ignored,
}

/// Intervals the user chose to watch, each with its own expiry.
#[derive(Debug)]
pub struct OverrideRegistry {
    entries: HashMap<IntervalKey, OverrideEntry>,
    extension: Duration,
}

impl OverrideRegistry {
    pub fn new(extension: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            extension,
        }
    }

    /// Insert or refresh an override for `key` lasting at least `minimum_watch`.
    pub fn mark_overridden(
        &mut self,
        key: IntervalKey,
        minimum_watch: Duration,
        reason: OverrideReason,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) {
        if let Some(previous) = self.entries.get(&key).and_then(|entry| entry.recheck) {
            timers.cancel(previous);
        }

        let deadline = now + minimum_watch;
        let recheck = timers.schedule(deadline, TimerTask::OverrideRecheck(key));
        self.entries.insert(
            key,
            OverrideEntry {
                key,
                reason,
                expires: OverrideExpiry::At(deadline),
                recheck: Some(recheck),
            },
        );
    }

    pub fn is_overridden(&self, key: IntervalKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: IntervalKey) -> Option<&OverrideEntry> {
        self.entries.get(&key)
    }

    /// A recheck timer fired. Keeps the override while playback is still
    /// inside the interval, otherwise removes it.
    pub fn on_recheck(
        &mut self,
        key: IntervalKey,
        timer: TimerId,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> RecheckOutcome {
        let Some(entry) = self.entries.get_mut(&key) else {
            return RecheckOutcome::Ignored;
        };
        if entry.recheck != Some(timer) {
            return RecheckOutcome::Ignored;
        }

        if key.contains(position) {
            entry.expires = OverrideExpiry::PinnedUntilExit;
            entry.recheck = Some(timers.schedule(now + self.extension, TimerTask::OverrideRecheck(key)));
            RecheckOutcome::Extended
        } else {
            self.entries.remove(&key);
            RecheckOutcome::Cleared
        }
    }

    /// Drop overrides whose minimum watch is over and whose interval playback
    /// has left. Returns the keys that were cleared.
    pub fn sweep(
        &mut self,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> Vec<IntervalKey> {
        let expired: Vec<IntervalKey> = self
            .entries
            .values()
            .filter(|entry| entry.minimum_watch_elapsed(now) && !entry.key.contains(position))
            .map(|entry| entry.key)
            .collect();

        for key in &expired {
            self.clear(*key, timers);
        }
        expired
    }

    pub fn clear(&mut self, key: IntervalKey, timers: &mut SessionTimers<'_>) -> bool {
        match self.entries.remove(&key) {
            Some(entry) => {
                if let Some(id) = entry.recheck {
                    timers.cancel(id);
                }
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self, timers: &mut SessionTimers<'_>) {
        for (_, entry) in self.entries.drain() {
            if let Some(id) = entry.recheck {
                timers.cancel(id);
            }
        }
    }

    pub fn keys(&self) -> Vec<IntervalKey> {
        let mut keys: Vec<IntervalKey> = self.entries.keys().copied().collect();
        keys.sort_by(|a, b| a.start().total_cmp(&b.start()).then(a.end().total_cmp(&b.end())));
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
