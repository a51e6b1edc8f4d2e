pub mod commands;
pub mod events;
pub mod manager;
pub mod state;

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

pub use commands::{channel, ClockEvent, Command, CommandReceiver, SkipperHandle};
pub use events::{MediaInfo, NotificationLevel, PlaybackHost, SessionSnapshot, UiEvent};
pub use manager::SessionManager;
pub use state::{ArmOutcome, FetchStatus, MediaStatus, Session, TimerOutcome};

/// Identity of one video session; timers and fetches are tagged with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.0.simple().to_string();
        f.write_str(&full[..8])
    }
}
