use anyhow::Result;
use chrono::{Duration, Utc};

use super::IntervalSource;
use crate::{
    db::Database,
    error::FetchError,
    models::{SkipInterval, UserPreferences, VideoId},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const DEFAULT_PREFERENCES_KEY: &str = "default";

/// Serves recent analysis results from SQLite and falls through to `inner` on a miss.
pub struct CachedIntervalSource<S> {
    inner: S,
    db: Database,
    ttl: Duration,
}

impl<S: IntervalSource> CachedIntervalSource<S> {
    pub fn new(inner: S, db: Database, ttl: Duration) -> Self {
        Self { inner, db, ttl }
    }

    pub async fn clear_video(&self, video_id: &VideoId) -> Result<usize> {
        self.db.clear_cached_video(video_id).await
    }

    /// Drop rows older than the TTL. Returns how many were removed.
    pub async fn prune(&self) -> Result<usize> {
        self.db.prune_cached_before(Utc::now() - self.ttl).await
    }

    async fn lookup(&self, video_id: &VideoId, key: &str) -> Option<Vec<SkipInterval>> {
        match self.db.get_cached_intervals(video_id, key).await {
            Ok(Some(cached)) if Utc::now() - cached.fetched_at < self.ttl => {
                log_info!("cache hit for {video_id} ({} intervals)", cached.intervals.len());
                Some(cached.intervals)
            }
            Ok(_) => None,
            Err(err) => {
                log_warn!("interval cache read failed for {video_id}: {err:#}");
                None
            }
        }
    }
}

fn preferences_key(preferences: Option<&UserPreferences>) -> String {
    preferences
        .map(UserPreferences::cache_key)
        .unwrap_or_else(|| DEFAULT_PREFERENCES_KEY.to_string())
}

#[async_trait::async_trait]
impl<S: IntervalSource> IntervalSource for CachedIntervalSource<S> {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferences: Option<&UserPreferences>,
    ) -> Result<Vec<SkipInterval>, FetchError> {
        let key = preferences_key(preferences);
        if let Some(intervals) = self.lookup(video_id, &key).await {
            return Ok(intervals);
        }

        let intervals = self.inner.fetch(video_id, preferences).await?;

        if let Err(err) = self
            .db
            .store_intervals(video_id, &key, &intervals, Utc::now())
            .await
        {
            log_warn!("interval cache write failed for {video_id}: {err:#}");
        }

        Ok(intervals)
    }

    async fn invalidate(&self, video_id: &VideoId) -> Result<()> {
        let removed = self.clear_video(video_id).await?;
        log_info!("cleared {removed} cached result(s) for {video_id}");
        self.inner.invalidate(video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;

    fn cached(source: FakeSource) -> CachedIntervalSource<FakeSource> {
        CachedIntervalSource::new(source, Database::in_memory().unwrap(), Duration::hours(24))
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let source = FakeSource::new();
        source.respond("abc", Ok(vec![SkipInterval::new(5.0, 9.0)]));
        let calls = source.calls();
        let cache = cached(source);
        let video = VideoId::new("abc");

        let first = cache.fetch(&video, None).await.unwrap();
        let second = cache.fetch(&video, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn preferences_are_part_of_the_key() {
        let source = FakeSource::new();
        source.respond("abc", Ok(vec![SkipInterval::new(5.0, 9.0)]));
        let calls = source.calls();
        let cache = cached(source);
        let video = VideoId::new("abc");

        let mut prefs = UserPreferences::default();
        prefs.custom_keywords.insert("giveaway".into());

        cache.fetch(&video, None).await.unwrap();
        cache.fetch(&video, Some(&prefs)).await.unwrap();
        cache.fetch(&video, Some(&prefs)).await.unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn stale_rows_and_invalidation_force_refetch() {
        let source = FakeSource::new();
        source.respond("abc", Ok(vec![SkipInterval::new(1.0, 2.0)]));
        let calls = source.calls();
        let db = Database::in_memory().unwrap();
        let cache = CachedIntervalSource::new(source, db.clone(), Duration::hours(24));
        let video = VideoId::new("abc");

        db.store_intervals(&video, "default", &[], Utc::now() - Duration::hours(30))
            .await
            .unwrap();
        assert_eq!(cache.fetch(&video, None).await.unwrap().len(), 1);
        assert_eq!(calls.get(), 1);

        cache.invalidate(&video).await.unwrap();
        cache.fetch(&video, None).await.unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let source = FakeSource::new();
        source.respond("abc", Err(FetchError::Timeout));
        let calls = source.calls();
        let cache = cached(source);
        let video = VideoId::new("abc");

        assert_eq!(cache.fetch(&video, None).await, Err(FetchError::Timeout));
        assert_eq!(cache.fetch(&video, None).await, Err(FetchError::Timeout));
        assert_eq!(calls.get(), 2);
    }
}
