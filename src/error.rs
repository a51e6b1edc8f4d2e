use crate::{models::VideoId, session::SessionId};

/// Why an interval fetch failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("could not reach the analysis service: {0}")]
    Network(String),

    #[error("the analysis service timed out")]
    Timeout,

    #[error("the analysis service rejected the request ({status}): {detail}")]
    Remote { status: u16, detail: String },

    #[error("unreadable response from the analysis service: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn title(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Connection failed",
            FetchError::Timeout => "Request timed out",
            FetchError::Remote { .. } => "Analysis failed",
            FetchError::Decode(_) => "Unexpected response",
        }
    }
}

/// Everything that can go wrong in a skip session.
///
/// Only [`SkipError::Fetch`] and [`SkipError::MediaNotReady`] are shown to the user;
/// the rest are handled internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no segments to skip in video {video_id}")]
    NoIntervals { video_id: VideoId },

    #[error("invalid interval [{start}, {end})")]
    InvalidInterval { start: f64, end: f64 },

    #[error("media element not available after {attempts} attempts")]
    MediaNotReady { attempts: u32 },

    #[error("result for torn-down session {session}")]
    SessionStale { session: SessionId },
}

impl SkipError {
    pub fn is_user_visible(&self) -> bool {
        matches!(self, SkipError::Fetch(_) | SkipError::MediaNotReady { .. })
    }
}
