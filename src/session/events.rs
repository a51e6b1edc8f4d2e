use serde::Serialize;

use super::{state::FetchStatus, SessionId};
use crate::{
    models::{SkipInterval, VideoId},
    skip::{ControllerState, SkipAction},
};

/// Current state of the media element as the host sees it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub position: f64,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Success,
    Notice,
    Error,
}

/// Everything the UI needs to draw markers and controls for the current video.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub video_id: VideoId,
    pub enabled: bool,
    pub controller: ControllerState,
    pub fetch: FetchStatus,
    pub intervals: Vec<SkipInterval>,
    pub overridden: Vec<SkipInterval>,
    pub last_applied_skip: Option<SkipInterval>,
    pub position: f64,
    pub duration: Option<f64>,
}

/// Outbound notifications to the UI surface.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiEvent {
    StateChanged {
        snapshot: SessionSnapshot,
    },
    Skipped {
        video_id: VideoId,
        action: SkipAction,
    },
    /// Markers for this video must be removed.
    OverlayCleared {
        video_id: VideoId,
    },
    Notification {
        level: NotificationLevel,
        title: String,
        message: String,
    },
}

impl UiEvent {
    pub fn notification(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        UiEvent::Notification {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// The live playback surface: the media element plus whatever renders markers.
///
/// Calls are fire-and-forget; the controller never waits on the host.
pub trait PlaybackHost: Send + Sync {
    /// `None` while the media element is missing.
    fn media(&self) -> Option<MediaInfo>;

    fn set_position(&self, position: f64);

    fn emit(&self, event: UiEvent);
}
