pub mod cached;
pub mod http;

use anyhow::Result;

use crate::{
    error::FetchError,
    models::{SkipInterval, UserPreferences, VideoId},
};

pub use cached::CachedIntervalSource;
pub use http::HttpIntervalSource;

/// Produces skip intervals for a video. The classification itself is remote.
#[async_trait::async_trait]
pub trait IntervalSource: Send + Sync {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferences: Option<&UserPreferences>,
    ) -> Result<Vec<SkipInterval>, FetchError>;

    /// Forget anything remembered about `video_id`.
    async fn invalidate(&self, _video_id: &VideoId) -> Result<()> {
        Ok(())
    }
}
