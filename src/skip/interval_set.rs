use crate::{
    error::SkipError,
    models::{IntervalKey, SkipInterval},
};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Skip intervals for one video, sorted by `(start, end)` and free of exact duplicates.
///
/// Built once per session and never mutated. Overlapping intervals are kept as
/// received; lookups resolve overlaps in favour of the earliest start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalSet {
    intervals: Vec<SkipInterval>,
}

impl IntervalSet {
    /// Build a set, logging and dropping anything malformed.
    pub fn from_intervals(batch: impl IntoIterator<Item = SkipInterval>) -> Self {
        let (set, rejected) = Self::build(batch);
        for err in &rejected {
            log_warn!("dropping skip interval: {err}");
        }
        set
    }

    /// Build a set and hand back the rejected entries.
    pub fn build(batch: impl IntoIterator<Item = SkipInterval>) -> (Self, Vec<SkipError>) {
        let mut rejected = Vec::new();
        let mut intervals: Vec<SkipInterval> = batch
            .into_iter()
            .filter(|interval| {
                let valid = interval.is_valid();
                if !valid {
                    rejected.push(SkipError::InvalidInterval {
                        start: interval.start,
                        end: interval.end,
                    });
                }
                valid
            })
            .collect();

        intervals.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
        intervals.dedup_by_key(|interval| interval.key());

        (Self { intervals }, rejected)
    }

    /// The interval covering `position`, earliest start first when several overlap.
    pub fn containing(&self, position: f64) -> Option<&SkipInterval> {
        if !position.is_finite() {
            return None;
        }
        let candidates = self
            .intervals
            .partition_point(|interval| interval.start <= position);
        self.intervals[..candidates]
            .iter()
            .find(|interval| interval.contains(position))
    }

    pub fn get(&self, key: IntervalKey) -> Option<&SkipInterval> {
        self.intervals.iter().find(|interval| interval.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkipInterval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[SkipInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Seconds covered by the union of all intervals.
    pub fn covered_seconds(&self) -> f64 {
        let mut total = 0.0;
        let mut reach = f64::NEG_INFINITY;
        for interval in &self.intervals {
            let start = interval.start.max(reach);
            if interval.end > start {
                total += interval.end - start;
            }
            reach = reach.max(interval.end);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(f64, f64)]) -> IntervalSet {
        IntervalSet::from_intervals(pairs.iter().map(|&(s, e)| SkipInterval::new(s, e)))
    }

    #[test]
    fn sorts_unordered_batches() {
        let set = set(&[(20.0, 25.0), (0.0, 5.0), (5.0, 12.0)]);
        let starts: Vec<f64> = set.iter().map(|interval| interval.start).collect();
        assert_eq!(starts, vec![0.0, 5.0, 20.0]);
    }

    #[test]
    fn invalid_intervals_are_rejected() {
        let (set, rejected) = IntervalSet::build(vec![
            SkipInterval::new(3.0, 3.0),
            SkipInterval::new(9.0, 4.0),
            SkipInterval::new(-2.0, 1.0),
            SkipInterval::new(1.0, 2.0),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(rejected.len(), 3);
        assert_eq!(
            rejected[0],
            SkipError::InvalidInterval {
                start: 3.0,
                end: 3.0
            }
        );
    }

    #[test]
    fn exact_duplicates_collapse() {
        let set = set(&[(1.0, 2.0), (1.0, 2.0), (1.0, 3.0)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn no_match_outside_every_interval() {
        let set = set(&[(10.0, 20.0), (30.0, 40.0)]);
        for t in [0.0, 9.99, 20.0, 25.0, 40.0, 1e6] {
            assert!(set.containing(t).is_none(), "unexpected match at {t}");
        }
        assert!(set.containing(f64::NAN).is_none());
    }

    #[test]
    fn overlap_resolves_to_earliest_start() {
        let set = set(&[(12.0, 30.0), (10.0, 15.0)]);
        assert_eq!(set.containing(13.0), Some(&SkipInterval::new(10.0, 15.0)));
        // Past the first interval's end only the later one still covers.
        assert_eq!(set.containing(16.0), Some(&SkipInterval::new(12.0, 30.0)));
    }

    #[test]
    fn nested_interval_defers_to_the_enclosing_one() {
        let set = set(&[(0.0, 100.0), (10.0, 20.0)]);
        assert_eq!(set.containing(15.0).map(|i| i.end), Some(100.0));
    }

    #[test]
    fn intervals_past_media_duration_are_kept() {
        let set = set(&[(5000.0, 5100.0)]);
        assert_eq!(set.len(), 1);
        assert!(set.containing(60.0).is_none());
    }

    #[test]
    fn lookup_by_key() {
        let set = set(&[(1.0, 2.0), (3.0, 4.0)]);
        let key = IntervalKey::new(3.0, 4.0);
        assert_eq!(set.get(key), Some(&SkipInterval::new(3.0, 4.0)));
        assert!(set.get(IntervalKey::new(3.0, 4.5)).is_none());
    }

    #[test]
    fn covered_seconds_merges_overlaps() {
        let set = set(&[(0.0, 10.0), (5.0, 15.0), (20.0, 25.0)]);
        assert!((set.covered_seconds() - 20.0).abs() < f64::EPSILON);
    }
}
