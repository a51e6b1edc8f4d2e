//! Connects the session manager to a page over a framed byte stream.

pub mod codec;
pub mod messages;

use std::sync::Mutex;

use anyhow::Result;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
};

use crate::session::{MediaInfo, PlaybackHost, SkipperHandle, UiEvent};

pub use codec::{read_message, write_message, MAX_MESSAGE_BYTES};
pub use messages::{HostMessage, OutboundMessage, PlayerCommand};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// [`PlaybackHost`] backed by the page on the other end of the bridge. Media
/// state is whatever the page last reported.
pub struct BridgeHost {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    media: Mutex<Option<MediaInfo>>,
}

impl BridgeHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound,
                media: Mutex::new(None),
            },
            rx,
        )
    }

    /// Track media state from an inbound message before the manager sees it.
    pub fn observe(&self, message: &HostMessage) {
        let mut media = self.media.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match *message {
            HostMessage::MediaAttached { position, duration } => {
                *media = Some(MediaInfo { position, duration });
            }
            HostMessage::MediaDetached | HostMessage::Navigate { .. } => *media = None,
            HostMessage::Tick { position }
            | HostMessage::SeekStart { position }
            | HostMessage::SeekEnd { position } => {
                let duration = media.and_then(|info| info.duration);
                *media = Some(MediaInfo { position, duration });
            }
            _ => {}
        }
    }

    fn send(&self, message: OutboundMessage) {
        if self.outbound.send(message).is_err() {
            log_debug!("bridge writer gone, dropping outbound message");
        }
    }
}

impl PlaybackHost for BridgeHost {
    fn media(&self) -> Option<MediaInfo> {
        *self.media.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_position(&self, position: f64) {
        self.send(OutboundMessage::Player(PlayerCommand::SetPosition { position }));
    }

    fn emit(&self, event: UiEvent) {
        self.send(OutboundMessage::Event(event));
    }
}

/// Pump inbound frames into the manager until the reader closes, then shut the
/// manager down. Outbound messages are written by a separate task that drains
/// whatever the manager emitted before it stopped.
pub async fn serve<R, W>(
    mut reader: R,
    mut writer: W,
    handle: SkipperHandle,
    host: &BridgeHost,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let writer_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                message = outbound.recv() => message,
                _ = &mut stop_rx => break,
            };
            let Some(message) = message else {
                return;
            };
            if let Err(err) = write_message(&mut writer, &message).await {
                log_error!("failed to write to host: {err:#}");
                return;
            }
        }
        while let Ok(message) = outbound.try_recv() {
            if let Err(err) = write_message(&mut writer, &message).await {
                log_error!("failed to write to host: {err:#}");
                return;
            }
        }
    });

    let result = pump(&mut reader, &handle, host).await;

    if handle.shutdown().is_ok() {
        handle.closed().await;
    }
    let _ = stop_tx.send(());
    if let Err(err) = writer_task.await {
        log_error!("bridge writer task failed: {err}");
    }
    log_info!("host bridge closed");
    result
}

async fn pump<R>(reader: &mut R, handle: &SkipperHandle, host: &BridgeHost) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let message: HostMessage = match read_message::<_, serde_json::Value>(reader).await? {
            None => return Ok(()),
            Some(value) => match serde_json::from_value(value) {
                Ok(message) => message,
                Err(err) => {
                    log_warn!("ignoring unrecognised host message: {err}");
                    continue;
                }
            },
        };

        host.observe(&message);
        match message.into_command() {
            Some(command) => handle.send(command)?,
            None => {
                let snapshot = handle.snapshot().await?;
                match snapshot {
                    Some(snapshot) => host.emit(UiEvent::StateChanged { snapshot }),
                    None => log_debug!("snapshot requested with no active session"),
                }
            }
        }
    }
}
