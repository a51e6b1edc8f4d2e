use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::{events::SessionSnapshot, SessionId};
use crate::{
    error::FetchError,
    models::{IntervalKey, SkipInterval, VideoId},
};

/// Discrete events from the media clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClockEvent {
    Tick { position: f64 },
    SeekStart { position: f64 },
    SeekEnd { position: f64 },
}

/// Everything the session manager reacts to. Processed strictly one at a time.
#[derive(Debug)]
pub enum Command {
    Navigate {
        url: String,
    },
    MediaAttached {
        duration: Option<f64>,
    },
    MediaDetached,
    Clock(ClockEvent),
    SetEnabled(bool),
    ProcessVideo,
    PlayInterval(IntervalKey),
    RewindToLastSkip,
    ClearCache,
    FetchResolved {
        session: SessionId,
        video_id: VideoId,
        result: Result<Vec<SkipInterval>, FetchError>,
    },
    Snapshot(oneshot::Sender<Option<SessionSnapshot>>),
    Shutdown,
}

pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

pub fn channel() -> (SkipperHandle, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SkipperHandle { tx }, rx)
}

/// Cheap, cloneable entry point into a running [`super::SessionManager`].
#[derive(Debug, Clone)]
pub struct SkipperHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SkipperHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("skip manager is no longer running"))
    }

    pub fn navigate(&self, url: impl Into<String>) -> Result<()> {
        self.send(Command::Navigate { url: url.into() })
    }

    pub fn media_attached(&self, duration: Option<f64>) -> Result<()> {
        self.send(Command::MediaAttached { duration })
    }

    pub fn media_detached(&self) -> Result<()> {
        self.send(Command::MediaDetached)
    }

    pub fn tick(&self, position: f64) -> Result<()> {
        self.send(Command::Clock(ClockEvent::Tick { position }))
    }

    pub fn seek_start(&self, position: f64) -> Result<()> {
        self.send(Command::Clock(ClockEvent::SeekStart { position }))
    }

    pub fn seek_end(&self, position: f64) -> Result<()> {
        self.send(Command::Clock(ClockEvent::SeekEnd { position }))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetEnabled(enabled))
    }

    pub fn process_video(&self) -> Result<()> {
        self.send(Command::ProcessVideo)
    }

    pub fn play_interval(&self, key: IntervalKey) -> Result<()> {
        self.send(Command::PlayInterval(key))
    }

    pub fn rewind_to_last_skip(&self) -> Result<()> {
        self.send(Command::RewindToLastSkip)
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.send(Command::ClearCache)
    }

    pub async fn snapshot(&self) -> Result<Option<SessionSnapshot>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("skip manager dropped the snapshot request"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Resolves once the manager has stopped and dropped its receiver.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub(crate) fn fetch_resolved(
        &self,
        session: SessionId,
        video_id: VideoId,
        result: Result<Vec<SkipInterval>, FetchError>,
    ) -> Result<()> {
        self.send(Command::FetchResolved {
            session,
            video_id,
            result,
        })
    }
}
