use tokio::time::Instant;

use super::{
    interval_set::IntervalSet,
    overrides::OverrideRegistry,
    seek_intent::SeekIntentTracker,
    state::{ControllerState, Decision, SkipAction},
};
use crate::models::SkipInterval;

/// Per-tick skip decision.
///
/// Holds no intervals itself; the owning session passes its components in so
/// that each tick is a pure function of current position and session state.
#[derive(Debug, Default)]
pub struct SkipController {
    state: ControllerState,
    last_applied_skip: Option<SkipInterval>,
    skips_applied: u64,
}

impl SkipController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ControllerState::Armed
    }

    pub fn last_applied_skip(&self) -> Option<SkipInterval> {
        self.last_applied_skip
    }

    pub fn skips_applied(&self) -> u64 {
        self.skips_applied
    }

    /// `Disabled -> Armed`. Refuses an empty interval set.
    pub fn arm(&mut self, intervals: &IntervalSet) -> bool {
        if intervals.is_empty() {
            return false;
        }
        self.state = ControllerState::Armed;
        true
    }

    pub fn disarm(&mut self) {
        self.state = ControllerState::Disabled;
    }

    pub fn evaluate(
        &self,
        position: f64,
        now: Instant,
        intervals: &IntervalSet,
        seek: &SeekIntentTracker,
        overrides: &OverrideRegistry,
    ) -> Decision {
        if self.state == ControllerState::Disabled {
            return Decision::Disabled;
        }
        if seek.is_manual_seek_in_progress() {
            return Decision::ManualSeekInProgress;
        }
        let Some(interval) = intervals.containing(position) else {
            return Decision::NoInterval;
        };
        let key = interval.key();
        if overrides.is_overridden(key) {
            return Decision::Overridden(key);
        }
        if seek.is_within_grace_period(now) {
            return Decision::GracePeriod(key);
        }
        Decision::Skip(*interval)
    }

    /// Evaluate a tick and, when it calls for a skip, record the jump.
    ///
    /// The returned action always moves forward: `to` is the end of an interval
    /// that contains `position`.
    pub fn on_tick(
        &mut self,
        position: f64,
        now: Instant,
        intervals: &IntervalSet,
        seek: &mut SeekIntentTracker,
        overrides: &OverrideRegistry,
    ) -> Option<SkipAction> {
        let Decision::Skip(interval) = self.evaluate(position, now, intervals, seek, overrides) else {
            return None;
        };

        self.state = ControllerState::Skipping;
        self.last_applied_skip = Some(interval);
        self.skips_applied += 1;
        seek.record_programmatic_seek(interval.end, now);
        self.state = ControllerState::Armed;

        Some(SkipAction {
            interval,
            from: position,
            to: interval.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::SkipperConfig,
        models::IntervalKey,
        session::SessionId,
        skip::{overrides::OverrideReason, timers::TimerQueue},
    };

    struct Rig {
        controller: SkipController,
        intervals: IntervalSet,
        seek: SeekIntentTracker,
        overrides: OverrideRegistry,
        timers: TimerQueue,
        session: SessionId,
    }

    impl Rig {
        fn new(pairs: &[(f64, f64)]) -> Self {
            let config = SkipperConfig::default();
            let intervals =
                IntervalSet::from_intervals(pairs.iter().map(|&(s, e)| SkipInterval::new(s, e)));
            let mut controller = SkipController::new();
            assert!(controller.arm(&intervals));
            Self {
                controller,
                intervals,
                seek: SeekIntentTracker::new(&config),
                overrides: OverrideRegistry::new(config.override_extension),
                timers: TimerQueue::new(),
                session: SessionId::new(),
            }
        }

        fn tick(&mut self, position: f64, now: Instant) -> Option<SkipAction> {
            self.controller
                .on_tick(position, now, &self.intervals, &mut self.seek, &self.overrides)
        }
    }

    #[test]
    fn never_skips_outside_intervals() {
        let mut rig = Rig::new(&[(10.0, 20.0), (30.0, 40.0)]);
        let now = Instant::now();
        for t in [0.0, 5.0, 9.99, 20.0, 25.0, 40.0, 100.0] {
            assert!(rig.tick(t, now).is_none(), "skipped at {t}");
        }
        assert!(rig.controller.last_applied_skip().is_none());
    }

    #[test]
    fn skips_to_exact_end_from_anywhere_inside() {
        let now = Instant::now();
        for t in [10.0, 12.5, 19.999] {
            let mut rig = Rig::new(&[(10.0, 20.0)]);
            let action = rig.tick(t, now).expect("expected a skip");
            assert_eq!(action.to, 20.0);
            assert!(action.to >= action.from);
            assert_eq!(
                rig.controller.last_applied_skip(),
                Some(SkipInterval::new(10.0, 20.0))
            );
            assert_eq!(rig.controller.state(), ControllerState::Armed);
        }
    }

    #[test]
    fn disabled_controller_never_skips() {
        let mut rig = Rig::new(&[(10.0, 20.0)]);
        rig.controller.disarm();
        assert!(rig.tick(15.0, Instant::now()).is_none());
    }

    #[test]
    fn empty_set_cannot_arm() {
        let mut controller = SkipController::new();
        assert!(!controller.arm(&IntervalSet::default()));
        assert_eq!(controller.state(), ControllerState::Disabled);
    }

    #[test]
    fn no_repeat_skip_once_past_the_end() {
        let mut rig = Rig::new(&[(10.0, 20.0)]);
        let now = Instant::now();
        assert!(rig.tick(12.0, now).is_some());
        for t in [20.0, 20.5, 21.0] {
            assert!(rig.tick(t, now).is_none());
        }
        assert_eq!(rig.controller.skips_applied(), 1);
    }

    #[test]
    fn manual_seek_in_progress_blocks_skip() {
        let mut rig = Rig::new(&[(10.0, 20.0)]);
        let now = Instant::now();
        rig.seek.on_seek_start(15.0, now, &mut rig.timers.scope(rig.session));

        let decision = rig
            .controller
            .evaluate(15.0, now, &rig.intervals, &rig.seek, &rig.overrides);
        assert_eq!(decision, Decision::ManualSeekInProgress);
    }

    #[test]
    fn grace_period_after_manual_seek_into_interval() {
        let mut rig = Rig::new(&[(10.0, 20.0)]);
        let t0 = Instant::now();
        let mut timers = rig.timers.scope(rig.session);
        rig.seek.on_seek_start(12.0, t0, &mut timers);
        rig.seek.on_seek_end(12.0, t0, &mut timers);
        let debounce = rig.timers.take_due(t0 + Duration::from_millis(500)).remove(0);
        rig.seek.on_debounce_elapsed(debounce.id);

        for millis in [500, 1000, 2000, 2999] {
            let now = t0 + Duration::from_millis(millis);
            assert!(rig.tick(12.0 + millis as f64 / 1000.0, now).is_none());
        }
        assert!(rig.tick(15.0, t0 + Duration::from_secs(3)).is_some());
    }

    #[test]
    fn override_blocks_skip_without_clearing() {
        let mut rig = Rig::new(&[(10.0, 20.0)]);
        let now = Instant::now();
        let key = IntervalKey::new(10.0, 20.0);
        rig.overrides.mark_overridden(
            key,
            Duration::from_secs(10),
            OverrideReason::MarkerClick,
            now,
            &mut rig.timers.scope(rig.session),
        );

        assert!(rig.tick(11.0, now).is_none());
        assert!(rig.tick(12.0, now).is_none());
        assert!(rig.overrides.is_overridden(key));
    }

    #[test]
    fn back_to_back_intervals_chain_across_ticks() {
        let mut rig = Rig::new(&[(0.0, 5.0), (5.0, 12.0), (20.0, 25.0)]);
        let now = Instant::now();
        let mut position = 0.0;
        let mut observed = Vec::new();

        for scripted in [0.0, 4.0, 5.0, 6.0, 12.0, 20.0, 24.0] {
            // The clock never runs backwards: a jump carries it past scripted ticks.
            position = f64::max(position, scripted);
            if let Some(action) = rig.tick(position, now) {
                assert!(action.to > position);
                position = action.to;
                observed.push(position);
            }
        }

        assert_eq!(observed, vec![5.0, 12.0, 25.0]);
    }

    #[test]
    fn scripted_ticks_each_jump_to_their_interval_end() {
        let mut rig = Rig::new(&[(0.0, 5.0), (5.0, 12.0), (20.0, 25.0)]);
        let now = Instant::now();
        let targets: Vec<Option<f64>> = [0.0, 4.0, 5.0, 6.0, 12.0, 20.0, 24.0]
            .into_iter()
            .map(|t| rig.tick(t, now).map(|action| action.to))
            .collect();

        assert_eq!(
            targets,
            vec![
                Some(5.0),
                Some(5.0),
                Some(12.0),
                Some(12.0),
                None,
                Some(25.0),
                Some(25.0)
            ]
        );
    }
}
