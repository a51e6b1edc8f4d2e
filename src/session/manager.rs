use std::sync::Arc;

use tokio::time::{sleep_until, Instant};

use super::{
    commands::{ClockEvent, Command, CommandReceiver, SkipperHandle},
    events::{MediaInfo, NotificationLevel, PlaybackHost, SessionSnapshot, UiEvent},
    state::{ArmOutcome, FetchStatus, Session, TimerOutcome},
    SessionId,
};
use crate::{
    error::{FetchError, SkipError},
    fetch::IntervalSource,
    models::{IntervalKey, SkipInterval, VideoId},
    settings::SettingsStore,
    skip::{ControllerState, IntervalSet, TimerQueue},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Owns the current video session and every timer. Runs as a single task and
/// handles one command at a time, so no state is ever shared.
pub struct SessionManager {
    host: Arc<dyn PlaybackHost>,
    source: Arc<dyn IntervalSource>,
    settings: Arc<SettingsStore>,
    handle: SkipperHandle,
    timers: TimerQueue,
    current: Option<Session>,
    enabled: bool,
}

impl SessionManager {
    pub fn new(
        host: Arc<dyn PlaybackHost>,
        source: Arc<dyn IntervalSource>,
        settings: Arc<SettingsStore>,
        handle: SkipperHandle,
    ) -> Self {
        let enabled = settings.enabled();
        Self {
            host,
            source,
            settings,
            handle,
            timers: TimerQueue::new(),
            current: None,
            enabled,
        }
    }

    pub async fn run(mut self, mut commands: CommandReceiver) {
        log_info!("skip manager started (enabled: {})", self.enabled);

        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command, Instant::now()),
                },
                _ = wait_for(deadline) => self.fire_due(Instant::now()),
            }
        }

        self.teardown_current();
        log_info!("skip manager stopped");
    }

    pub fn handle_command(&mut self, command: Command, now: Instant) {
        match command {
            Command::Navigate { url } => self.navigate(&url, now),
            Command::MediaAttached { duration } => self.media_attached(duration, now),
            Command::MediaDetached => self.media_detached(),
            Command::Clock(event) => self.on_clock(event, now),
            Command::SetEnabled(enabled) => self.set_enabled(enabled, now),
            Command::ProcessVideo => self.process_video(),
            Command::PlayInterval(key) => self.play_interval(key, now),
            Command::RewindToLastSkip => self.rewind(now),
            Command::ClearCache => self.clear_cache(),
            Command::FetchResolved {
                session,
                video_id,
                result,
            } => self.on_fetch_resolved(session, video_id, result, now),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => self.teardown_current(),
        }
    }

    /// Run every timer due at `now`. Timers for a session that is no longer
    /// current are dropped.
    pub fn fire_due(&mut self, now: Instant) {
        for timer in self.timers.take_due(now) {
            let outcome = match self.current.as_mut() {
                Some(session) if session.id() == timer.session => {
                    let media = self.host.media();
                    session.on_timer(&timer, media, now, &mut self.timers.scope(timer.session))
                }
                _ => {
                    let err = SkipError::SessionStale {
                        session: timer.session,
                    };
                    log_debug!("discarding timer: {err}");
                    continue;
                }
            };

            match outcome {
                TimerOutcome::Nothing | TimerOutcome::ManualSeekCleared => {}
                TimerOutcome::OverrideExtended(key) => {
                    log_debug!(session = timer.session; "still inside {key}, override extended");
                }
                TimerOutcome::OverrideCleared(key) => {
                    log_debug!(session = timer.session; "override on {key} cleared");
                    self.emit_state();
                }
                TimerOutcome::Media(ArmOutcome::Armed) => {
                    log_info!(session = timer.session; "media found, controller armed");
                    self.emit_state();
                }
                TimerOutcome::Media(_) => {}
                TimerOutcome::MediaGaveUp { attempts } => {
                    self.report_error(SkipError::MediaNotReady { attempts });
                    self.emit_state();
                }
            }
        }
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.current
            .as_ref()
            .map(|session| session.snapshot(self.enabled))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending_timers(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |session| self.timers.pending_for(session.id()))
    }

    fn navigate(&mut self, url: &str, now: Instant) {
        let Some(video_id) = VideoId::from_url(url) else {
            if self.current.is_some() {
                log_info!("left video page ({url})");
                self.teardown_current();
            }
            return;
        };

        if self
            .current
            .as_ref()
            .is_some_and(|session| session.video_id() == &video_id)
        {
            return;
        }

        self.teardown_current();
        self.open_session(video_id);
        if self.enabled {
            self.start_fetch();
        }
        self.arm(now);
        self.emit_state();
    }

    /// Preferences and timings are read here and fixed for the session's lifetime.
    /// The enabled flag is not: the manager owns it after startup.
    fn open_session(&mut self, video_id: VideoId) {
        let settings = self.settings.snapshot();

        let session = Session::new(video_id, settings.user_preferences, settings.timings);
        log_info!(session = session.id(); "session opened for {}", session.video_id());
        self.current = Some(session);
    }

    fn start_fetch(&mut self) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        session.set_fetch_status(FetchStatus::InFlight);

        let session_id = session.id();
        let video_id = session.video_id().clone();
        let preferences = Some(session.preferences().clone()).filter(|prefs| prefs.enabled);
        let token = session.cancel_token();
        let source = Arc::clone(&self.source);
        let handle = self.handle.clone();

        self.host.emit(UiEvent::notification(
            NotificationLevel::Info,
            "Processing",
            "Analyzing video transcript...",
        ));

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    log_debug!(session = session_id; "fetch for {video_id} cancelled");
                    return;
                }
                result = source.fetch(&video_id, preferences.as_ref()) => result,
            };
            if let Err(err) = handle.fetch_resolved(session_id, video_id, result) {
                log_warn!(session = session_id; "dropping fetch result: {err}");
            }
        });
    }

    fn on_fetch_resolved(
        &mut self,
        session_id: SessionId,
        video_id: VideoId,
        result: Result<Vec<SkipInterval>, FetchError>,
        now: Instant,
    ) {
        let Some(session) = self
            .current
            .as_mut()
            .filter(|session| session.id() == session_id && session.video_id() == &video_id)
        else {
            let err = SkipError::SessionStale {
                session: session_id,
            };
            log_debug!("discarding fetch for {video_id}: {err}");
            return;
        };

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                session.set_fetch_status(FetchStatus::Failed);
                self.report_error(err.into());
                self.emit_state();
                return;
            }
        };

        let (intervals, rejected) = IntervalSet::build(raw);
        for err in &rejected {
            log_warn!(session = session_id; "dropping skip interval: {err}");
        }
        let count = intervals.len();
        session.load_intervals(intervals);

        if count == 0 {
            let notice = SkipError::NoIntervals { video_id };
            log_info!(session = session_id; "{notice}");
            self.host.emit(UiEvent::notification(
                NotificationLevel::Notice,
                "Notice",
                "No segments to skip in this video.",
            ));
            self.emit_state();
            return;
        }

        log_info!(session = session_id; "loaded {count} skip intervals for {video_id}");
        if self.enabled {
            self.host.emit(UiEvent::notification(
                NotificationLevel::Success,
                "Success",
                format!("Found {count} segments to skip. Skipper is now active."),
            ));
            self.arm(now);
        }
        self.emit_state();
    }

    fn arm(&mut self, now: Instant) -> Option<ArmOutcome> {
        if !self.enabled {
            return None;
        }
        let session = self.current.as_mut()?;
        let id = session.id();
        let outcome = session.try_arm(self.host.media(), now, &mut self.timers.scope(id));
        match outcome {
            ArmOutcome::Armed => log_info!(session = id; "controller armed"),
            ArmOutcome::WaitingForMedia => log_debug!(session = id; "waiting for media element"),
            ArmOutcome::AlreadyArmed | ArmOutcome::NothingToArm => {}
        }
        Some(outcome)
    }

    fn media_attached(&mut self, duration: Option<f64>, now: Instant) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        session.on_media_attached(duration);
        if self.arm(now) == Some(ArmOutcome::Armed) {
            self.emit_state();
        }
    }

    fn media_detached(&mut self) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let id = session.id();
        session.on_media_detached(&mut self.timers.scope(id));
        log_debug!(session = id; "media detached");
        self.emit_state();
    }

    fn on_clock(&mut self, event: ClockEvent, now: Instant) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let id = session.id();

        match event {
            ClockEvent::Tick { position } => {
                // A tick proves the element exists even if the host lost track of it.
                if self.enabled && session.controller_state() == ControllerState::Disabled {
                    let media = self.host.media().or(Some(MediaInfo {
                        position,
                        duration: None,
                    }));
                    if session.try_arm(media, now, &mut self.timers.scope(id)) == ArmOutcome::Armed {
                        log_info!(session = id; "controller armed on first tick");
                    }
                }

                let outcome = session.on_tick(position, now, &mut self.timers.scope(id));
                let video_id = session.video_id().clone();
                let changed = outcome.action.is_some() || !outcome.cleared_overrides.is_empty();

                if let Some(action) = outcome.action {
                    log_info!(session = id; "skipping {} ({:.2} -> {:.2})", action.interval, action.from, action.to);
                    self.host.set_position(action.to);
                    self.host.emit(UiEvent::Skipped { video_id, action });
                }
                if changed {
                    self.emit_state();
                }
            }
            ClockEvent::SeekStart { position } => {
                session.on_seek_start(position, now, &mut self.timers.scope(id));
            }
            ClockEvent::SeekEnd { position } => {
                if let Some(key) = session.on_seek_end(position, now, &mut self.timers.scope(id)) {
                    log_debug!(session = id; "manual seek into {key}, override set");
                    self.emit_state();
                }
            }
        }
    }

    fn set_enabled(&mut self, enabled: bool, now: Instant) {
        if let Err(err) = self.settings.set_enabled(enabled) {
            log_error!("failed to persist enabled flag: {err:#}");
            self.host.emit(UiEvent::notification(
                NotificationLevel::Error,
                "Settings not saved",
                "Couldn't save this setting. It applies until the skipper restarts.",
            ));
        }
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        log_info!("skipper {}", if enabled { "enabled" } else { "disabled" });

        let Some(session) = self.current.as_mut() else {
            return;
        };

        if enabled {
            match session.fetch_status() {
                FetchStatus::Loaded => {
                    self.arm(now);
                }
                FetchStatus::Idle | FetchStatus::Failed => self.start_fetch(),
                FetchStatus::InFlight => {}
            }
        } else {
            let id = session.id();
            let video_id = session.video_id().clone();
            session.disable(&mut self.timers.scope(id));
            self.host.emit(UiEvent::OverlayCleared { video_id });
        }
        self.emit_state();
    }

    /// Throw away the current session and analyse the same video again,
    /// regardless of the enabled flag.
    fn process_video(&mut self) {
        let Some(video_id) = self.current.as_ref().map(|session| session.video_id().clone()) else {
            self.host.emit(UiEvent::notification(
                NotificationLevel::Notice,
                "Notice",
                "Open a video to process it.",
            ));
            return;
        };

        self.teardown_current();
        self.open_session(video_id);
        self.start_fetch();
        self.emit_state();
    }

    fn play_interval(&mut self, key: IntervalKey, now: Instant) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let id = session.id();
        match session.play_interval(key, now, &mut self.timers.scope(id)) {
            Some(target) => {
                log_debug!(session = id; "playing {key} from {target:.2}");
                self.host.set_position(target);
                self.emit_state();
            }
            None => log_warn!(session = id; "no interval {key} to play"),
        }
    }

    fn rewind(&mut self, now: Instant) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let id = session.id();
        match session.rewind_to_last_skip(now, &mut self.timers.scope(id)) {
            Some(target) => {
                log_debug!(session = id; "rewinding to {target:.2}");
                self.host.set_position(target);
                self.emit_state();
            }
            None => log_debug!(session = id; "nothing skipped yet, rewind ignored"),
        }
    }

    fn clear_cache(&self) {
        let Some(video_id) = self.current.as_ref().map(|session| session.video_id().clone()) else {
            return;
        };
        let source = Arc::clone(&self.source);
        let host = Arc::clone(&self.host);

        tokio::spawn(async move {
            match source.invalidate(&video_id).await {
                Ok(()) => host.emit(UiEvent::notification(
                    NotificationLevel::Success,
                    "Cache cleared",
                    format!("Cached results for {video_id} were removed."),
                )),
                Err(err) => log_error!("failed to clear cache for {video_id}: {err:#}"),
            }
        });
    }

    fn report_error(&mut self, err: SkipError) {
        match self.current.as_ref() {
            Some(session) => log_error!(session = session.id(); "{err}"),
            None => log_error!("{err}"),
        }
        if !err.is_user_visible() {
            return;
        }

        let (title, message) = match &err {
            SkipError::Fetch(FetchError::Remote { detail, .. }) => {
                ("Analysis failed", detail.clone())
            }
            SkipError::Fetch(FetchError::Network(_)) => (
                "Connection failed",
                "Failed to connect to server. Make sure the backend is running.".to_string(),
            ),
            SkipError::Fetch(fetch) => (fetch.title(), fetch.to_string()),
            SkipError::MediaNotReady { .. } => ("Video player not found", err.to_string()),
            _ => ("Error", err.to_string()),
        };
        self.host
            .emit(UiEvent::notification(NotificationLevel::Error, title, message));
    }

    fn teardown_current(&mut self) {
        let Some(mut session) = self.current.take() else {
            return;
        };
        let id = session.id();
        session.teardown(&mut self.timers.scope(id));
        log_info!(session = id; "session for {} closed", session.video_id());
        self.host.emit(UiEvent::OverlayCleared {
            video_id: session.video_id().clone(),
        });
    }

    fn emit_state(&self) {
        if let Some(snapshot) = self.snapshot() {
            self.host.emit(UiEvent::StateChanged { snapshot });
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
