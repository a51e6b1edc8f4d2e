//! Fakes shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use tokio::sync::Semaphore;

use crate::{
    error::FetchError,
    fetch::IntervalSource,
    models::{SkipInterval, UserPreferences, VideoId},
    session::{MediaInfo, NotificationLevel, PlaybackHost, UiEvent},
};

#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Canned interval source. Unknown videos resolve to an empty list.
#[derive(Clone, Default)]
pub struct FakeSource {
    responses: Arc<Mutex<HashMap<String, Result<Vec<SkipInterval>, FetchError>>>>,
    requests: Arc<Mutex<Vec<(VideoId, Option<UserPreferences>)>>>,
    invalidated: Arc<Mutex<Vec<VideoId>>>,
    calls: CallCounter,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch blocks until [`FakeSource::release`] hands out a permit.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn respond(&self, video_id: &str, result: Result<Vec<SkipInterval>, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(video_id.to_string(), result);
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    pub fn requests(&self) -> Vec<(VideoId, Option<UserPreferences>)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn invalidated(&self) -> Vec<VideoId> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IntervalSource for FakeSource {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferences: Option<&UserPreferences>,
    ) -> Result<Vec<SkipInterval>, FetchError> {
        self.calls.bump();
        self.requests
            .lock()
            .unwrap()
            .push((video_id.clone(), preferences.cloned()));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.responses
            .lock()
            .unwrap()
            .get(video_id.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn invalidate(&self, video_id: &VideoId) -> anyhow::Result<()> {
        self.invalidated.lock().unwrap().push(video_id.clone());
        Ok(())
    }
}

/// Playback host that records every call.
#[derive(Default)]
pub struct RecordingHost {
    media: Mutex<Option<MediaInfo>>,
    positions: Mutex<Vec<f64>>,
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(position: f64, duration: f64) -> Self {
        let host = Self::default();
        host.set_media(Some(MediaInfo {
            position,
            duration: Some(duration),
        }));
        host
    }

    pub fn set_media(&self, media: Option<MediaInfo>) {
        *self.media.lock().unwrap() = media;
    }

    pub fn positions(&self) -> Vec<f64> {
        self.positions.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn notifications(&self) -> Vec<(NotificationLevel, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Notification { level, message, .. } => Some((level, message)),
                _ => None,
            })
            .collect()
    }

    pub fn overlay_clears(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, UiEvent::OverlayCleared { .. }))
            .count()
    }
}

impl PlaybackHost for RecordingHost {
    fn media(&self) -> Option<MediaInfo> {
        *self.media.lock().unwrap()
    }

    fn set_position(&self, position: f64) {
        self.positions.lock().unwrap().push(position);
        if let Some(media) = self.media.lock().unwrap().as_mut() {
            media.position = position;
        }
    }

    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}
