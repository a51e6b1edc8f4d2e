use std::fmt;

use serde::{Deserialize, Serialize};

/// A `[start, end)` range of playback time, in seconds, recommended for elision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SkipInterval {
    pub start: f64,
    pub end: f64,
}

impl SkipInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Finite, non-negative start and strictly positive length.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end > self.start
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }

    pub fn key(&self) -> IntervalKey {
        IntervalKey::new(self.start, self.end)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for SkipInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2})", self.start, self.end)
    }
}

/// Identity of an interval within one session, derived from its bounds.
///
/// Stores the bit patterns so the key can be hashed; `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalKey {
    start_bits: u64,
    end_bits: u64,
}

impl IntervalKey {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start_bits: (start + 0.0).to_bits(),
            end_bits: (end + 0.0).to_bits(),
        }
    }

    pub fn start(&self) -> f64 {
        f64::from_bits(self.start_bits)
    }

    pub fn end(&self) -> f64 {
        f64::from_bits(self.end_bits)
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start() && position < self.end()
    }
}

impl From<SkipInterval> for IntervalKey {
    fn from(interval: SkipInterval) -> Self {
        interval.key()
    }
}

impl fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}-{:.2}", self.start(), self.end())
    }
}
