use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::models::{SkipInterval, VideoId};

/// A stored analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedIntervals {
    pub intervals: Vec<SkipInterval>,
    pub fetched_at: DateTime<Utc>,
}

impl Database {
    pub async fn get_cached_intervals(
        &self,
        video_id: &VideoId,
        preferences_key: &str,
    ) -> Result<Option<CachedIntervals>> {
        let video_id = video_id.as_str().to_string();
        let preferences_key = preferences_key.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT intervals_json, fetched_at
                     FROM interval_cache
                     WHERE video_id = ?1 AND preferences_key = ?2",
                    params![video_id, preferences_key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            let Some((intervals_json, fetched_at)) = row else {
                return Ok(None);
            };

            let intervals: Vec<SkipInterval> = serde_json::from_str(&intervals_json)
                .with_context(|| format!("corrupt cached intervals for {video_id}"))?;

            Ok(Some(CachedIntervals {
                intervals,
                fetched_at: parse_datetime(&fetched_at)?,
            }))
        })
        .await
    }

    pub async fn store_intervals(
        &self,
        video_id: &VideoId,
        preferences_key: &str,
        intervals: &[SkipInterval],
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let video_id = video_id.as_str().to_string();
        let preferences_key = preferences_key.to_string();
        let intervals_json =
            serde_json::to_string(intervals).context("failed to serialize intervals")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO interval_cache (video_id, preferences_key, intervals_json, fetched_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (video_id, preferences_key) DO UPDATE SET
                     intervals_json = excluded.intervals_json,
                     fetched_at = excluded.fetched_at",
                params![video_id, preferences_key, intervals_json, fetched_at.to_rfc3339()],
            )
            .with_context(|| "failed to store cached intervals")?;
            Ok(())
        })
        .await
    }

    /// Remove every cached result for a video. Returns the number of rows removed.
    pub async fn clear_cached_video(&self, video_id: &VideoId) -> Result<usize> {
        let video_id = video_id.as_str().to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM interval_cache WHERE video_id = ?1",
                    params![video_id],
                )
                .with_context(|| "failed to clear cached intervals")?;
            Ok(removed)
        })
        .await
    }

    pub async fn prune_cached_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM interval_cache WHERE fetched_at < ?1",
                    params![cutoff.to_rfc3339()],
                )
                .with_context(|| "failed to prune interval cache")?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn stores_and_replaces_per_preferences() {
        let db = Database::in_memory().unwrap();
        let video = VideoId::new("abc");
        let now = Utc::now();

        db.store_intervals(&video, "default", &[SkipInterval::new(1.0, 2.0)], now)
            .await
            .unwrap();
        db.store_intervals(&video, "default", &[SkipInterval::new(3.0, 4.5)], now)
            .await
            .unwrap();
        db.store_intervals(&video, "custom", &[SkipInterval::new(9.0, 10.0)], now)
            .await
            .unwrap();

        let cached = db.get_cached_intervals(&video, "default").await.unwrap().unwrap();
        assert_eq!(cached.intervals, vec![SkipInterval::new(3.0, 4.5)]);
        assert!(db.get_cached_intervals(&VideoId::new("zzz"), "default").await.unwrap().is_none());

        assert_eq!(db.clear_cached_video(&video).await.unwrap(), 2);
        assert!(db.get_cached_intervals(&video, "custom").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prune_drops_only_old_rows() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();

        db.store_intervals(&VideoId::new("old"), "default", &[], now - Duration::hours(48))
            .await
            .unwrap();
        db.store_intervals(&VideoId::new("new"), "default", &[], now)
            .await
            .unwrap();

        assert_eq!(db.prune_cached_before(now - Duration::hours(24)).await.unwrap(), 1);
        assert!(db.get_cached_intervals(&VideoId::new("new"), "default").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.sqlite3");
        let video = VideoId::new("abc");

        {
            let db = Database::new(path.clone()).unwrap();
            db.store_intervals(&video, "default", &[SkipInterval::new(0.5, 7.25)], Utc::now())
                .await
                .unwrap();
        }

        let db = Database::new(path).unwrap();
        let cached = db.get_cached_intervals(&video, "default").await.unwrap().unwrap();
        assert_eq!(cached.intervals, vec![SkipInterval::new(0.5, 7.25)]);
    }
}
