use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    events::{MediaInfo, SessionSnapshot},
    SessionId,
};
use crate::{
    config::SkipperConfig,
    models::{IntervalKey, SkipInterval, UserPreferences, VideoId},
    skip::{
        ControllerState, IntervalSet, OverrideReason, OverrideRegistry, RecheckOutcome,
        ScheduledTimer, SeekIntentTracker, SeekOrigin, SessionTimers, SkipAction, SkipController,
        TimerId, TimerTask,
    },
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FetchStatus {
    Idle,
    InFlight,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaStatus {
    Unknown,
    Waiting { attempts: u32, retry: Option<TimerId> },
    Ready { duration: Option<f64> },
    /// Retry budget exhausted.
    GaveUp { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    Armed,
    AlreadyArmed,
    /// No intervals yet, or an empty set.
    NothingToArm,
    WaitingForMedia,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerOutcome {
    Nothing,
    ManualSeekCleared,
    OverrideExtended(IntervalKey),
    OverrideCleared(IntervalKey),
    Media(ArmOutcome),
    MediaGaveUp { attempts: u32 },
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub action: Option<SkipAction>,
    pub cleared_overrides: Vec<IntervalKey>,
}

/// All state scoped to one video. Built on navigation, dropped on the next one.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    video_id: VideoId,
    preferences: UserPreferences,
    config: SkipperConfig,
    intervals: Option<IntervalSet>,
    overrides: OverrideRegistry,
    seek: SeekIntentTracker,
    controller: SkipController,
    last_position: f64,
    media: MediaStatus,
    fetch: FetchStatus,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(video_id: VideoId, preferences: UserPreferences, config: SkipperConfig) -> Self {
        Self {
            id: SessionId::new(),
            video_id,
            preferences,
            overrides: OverrideRegistry::new(config.override_extension),
            seek: SeekIntentTracker::new(&config),
            config,
            intervals: None,
            controller: SkipController::new(),
            last_position: 0.0,
            media: MediaStatus::Unknown,
            fetch: FetchStatus::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn intervals(&self) -> Option<&IntervalSet> {
        self.intervals.as_ref()
    }

    pub fn controller_state(&self) -> ControllerState {
        self.controller.state()
    }

    pub fn last_applied_skip(&self) -> Option<SkipInterval> {
        self.controller.last_applied_skip()
    }

    pub fn position(&self) -> f64 {
        self.last_position
    }

    pub fn media_status(&self) -> MediaStatus {
        self.media
    }

    pub fn is_waiting_for_media(&self) -> bool {
        matches!(self.media, MediaStatus::Waiting { .. } | MediaStatus::Unknown)
    }

    pub fn is_overridden(&self, key: IntervalKey) -> bool {
        self.overrides.is_overridden(key)
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.fetch
    }

    pub fn set_fetch_status(&mut self, status: FetchStatus) {
        self.fetch = status;
    }

    /// Token cancelled at teardown; in-flight work for this session watches it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn load_intervals(&mut self, intervals: IntervalSet) {
        self.intervals = Some(intervals);
        self.fetch = FetchStatus::Loaded;
    }

    /// Arm the controller if there is something to skip and somewhere to skip it.
    /// Without media, starts the retry cycle.
    pub fn try_arm(
        &mut self,
        media: Option<MediaInfo>,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> ArmOutcome {
        let Some(intervals) = self.intervals.as_ref().filter(|set| !set.is_empty()) else {
            return ArmOutcome::NothingToArm;
        };
        if self.controller.is_armed() {
            return ArmOutcome::AlreadyArmed;
        }

        match media {
            Some(info) => {
                if let MediaStatus::Waiting {
                    retry: Some(id), ..
                } = self.media
                {
                    timers.cancel(id);
                }
                self.media = MediaStatus::Ready {
                    duration: info.duration,
                };
                self.last_position = info.position;
                self.controller.arm(intervals);
                ArmOutcome::Armed
            }
            None => {
                if let MediaStatus::Waiting { retry: Some(_), .. } = self.media {
                    return ArmOutcome::WaitingForMedia;
                }
                let retry = timers.schedule(
                    now + self.config.media_retry_interval,
                    TimerTask::MediaRetry { attempt: 1 },
                );
                self.media = MediaStatus::Waiting {
                    attempts: 0,
                    retry: Some(retry),
                };
                ArmOutcome::WaitingForMedia
            }
        }
    }

    pub fn on_media_attached(&mut self, duration: Option<f64>) {
        if let MediaStatus::Ready { duration: known } = &mut self.media {
            *known = duration.or(*known);
        }
    }

    pub fn on_media_detached(&mut self, timers: &mut SessionTimers<'_>) {
        self.controller.disarm();
        self.seek.reset(timers);
        if let MediaStatus::Waiting { retry: Some(id), .. } = self.media {
            timers.cancel(id);
        }
        self.media = MediaStatus::Unknown;
    }

    pub fn on_tick(
        &mut self,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> TickOutcome {
        self.last_position = position;
        let cleared_overrides = self.overrides.sweep(position, now, timers);

        let action = match self.intervals.as_ref() {
            Some(intervals) => {
                self.controller
                    .on_tick(position, now, intervals, &mut self.seek, &self.overrides)
            }
            None => None,
        };
        if let Some(action) = action {
            self.last_position = action.to;
        }

        TickOutcome {
            action,
            cleared_overrides,
        }
    }

    pub fn on_seek_start(&mut self, position: f64, now: Instant, timers: &mut SessionTimers<'_>) {
        self.seek.on_seek_start(position, now, timers);
        self.last_position = position;
    }

    /// Returns the interval that was overridden because the seek landed in it.
    pub fn on_seek_end(
        &mut self,
        position: f64,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> Option<IntervalKey> {
        let origin = self.seek.on_seek_end(position, now, timers);
        self.last_position = position;
        if origin != SeekOrigin::Manual {
            return None;
        }

        let key = self.intervals.as_ref()?.containing(position)?.key();
        self.overrides.mark_overridden(
            key,
            self.config.manual_seek_watch,
            OverrideReason::ManualSeek,
            now,
            timers,
        );
        Some(key)
    }

    /// Marker click: override the interval and return where to seek.
    pub fn play_interval(
        &mut self,
        key: IntervalKey,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> Option<f64> {
        let interval = *self.intervals.as_ref()?.get(key)?;
        Some(self.enter_interval(interval, self.config.marker_watch, OverrideReason::MarkerClick, now, timers))
    }

    /// Re-enter the most recently skipped interval and return where to seek.
    pub fn rewind_to_last_skip(&mut self, now: Instant, timers: &mut SessionTimers<'_>) -> Option<f64> {
        let interval = self.controller.last_applied_skip()?;
        Some(self.enter_interval(interval, self.config.rewind_watch, OverrideReason::Rewind, now, timers))
    }

    fn enter_interval(
        &mut self,
        interval: SkipInterval,
        watch: std::time::Duration,
        reason: OverrideReason,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> f64 {
        self.overrides
            .mark_overridden(interval.key(), watch, reason, now, timers);
        self.seek.record_programmatic_seek(interval.start, now);
        self.last_position = interval.start;
        interval.start
    }

    pub fn on_timer(
        &mut self,
        timer: &ScheduledTimer,
        media: Option<MediaInfo>,
        now: Instant,
        timers: &mut SessionTimers<'_>,
    ) -> TimerOutcome {
        match timer.task {
            TimerTask::ClearManualSeek => {
                if self.seek.on_debounce_elapsed(timer.id) {
                    TimerOutcome::ManualSeekCleared
                } else {
                    TimerOutcome::Nothing
                }
            }
            TimerTask::OverrideRecheck(key) => {
                match self
                    .overrides
                    .on_recheck(key, timer.id, self.last_position, now, timers)
                {
                    RecheckOutcome::Cleared => TimerOutcome::OverrideCleared(key),
                    RecheckOutcome::Extended => TimerOutcome::OverrideExtended(key),
                    RecheckOutcome::Ignored => TimerOutcome::Nothing,
                }
            }
            TimerTask::MediaRetry { attempt } => {
                let MediaStatus::Waiting { retry: Some(pending), .. } = self.media else {
                    return TimerOutcome::Nothing;
                };
                if pending != timer.id {
                    return TimerOutcome::Nothing;
                }

                if media.is_some() {
                    self.media = MediaStatus::Waiting {
                        attempts: attempt,
                        retry: None,
                    };
                    return TimerOutcome::Media(self.try_arm(media, now, timers));
                }

                if attempt >= self.config.media_retry_budget {
                    self.media = MediaStatus::GaveUp { attempts: attempt };
                    return TimerOutcome::MediaGaveUp { attempts: attempt };
                }

                let retry = timers.schedule(
                    now + self.config.media_retry_interval,
                    TimerTask::MediaRetry {
                        attempt: attempt + 1,
                    },
                );
                self.media = MediaStatus::Waiting {
                    attempts: attempt,
                    retry: Some(retry),
                };
                TimerOutcome::Media(ArmOutcome::WaitingForMedia)
            }
        }
    }

    /// Back to `Disabled`, keeping the fetched intervals for a later re-enable.
    pub fn disable(&mut self, timers: &mut SessionTimers<'_>) {
        self.controller.disarm();
        self.overrides.clear_all(timers);
        self.seek.reset(timers);
        timers.cancel_all();
        if !matches!(self.media, MediaStatus::Ready { .. }) {
            self.media = MediaStatus::Unknown;
        }
    }

    /// Cancel everything this session started. The session must not be used afterwards.
    pub fn teardown(&mut self, timers: &mut SessionTimers<'_>) {
        self.cancel.cancel();
        self.controller.disarm();
        self.overrides.clear_all(timers);
        self.seek.reset(timers);
        timers.cancel_all();
    }

    pub fn snapshot(&self, enabled: bool) -> SessionSnapshot {
        let intervals: Vec<SkipInterval> = self
            .intervals
            .as_ref()
            .map(|set| set.as_slice().to_vec())
            .unwrap_or_default();
        let overridden = intervals
            .iter()
            .filter(|interval| self.overrides.is_overridden(interval.key()))
            .copied()
            .collect();
        let duration = match self.media {
            MediaStatus::Ready { duration } => duration,
            _ => None,
        };

        SessionSnapshot {
            session_id: self.id,
            video_id: self.video_id.clone(),
            enabled,
            controller: self.controller.state(),
            fetch: self.fetch,
            intervals,
            overridden,
            last_applied_skip: self.controller.last_applied_skip(),
            position: self.last_position,
            duration,
        }
    }
}
