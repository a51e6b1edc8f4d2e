use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// The seek debounce is never allowed below this, since browsers double-fire
/// seek events within a few hundred milliseconds.
pub const MIN_SEEK_DEBOUNCE: Duration = Duration::from_millis(500);

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Tunable timings for the skip controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SkipperConfig {
    /// Delay after seek-end before the manual-seek flag drops.
    #[serde(with = "millis")]
    pub seek_debounce: Duration,
    /// Automatic skipping stays off this long after a manual seek.
    #[serde(with = "millis")]
    pub grace_period: Duration,
    /// Minimum watch when a manual seek lands inside an interval.
    #[serde(with = "millis")]
    pub manual_seek_watch: Duration,
    /// Minimum watch after rewinding into the last skipped interval.
    #[serde(with = "millis")]
    pub rewind_watch: Duration,
    /// Minimum watch after clicking an interval marker.
    #[serde(with = "millis")]
    pub marker_watch: Duration,
    /// Re-check period for an override whose interval is still being watched.
    #[serde(with = "millis")]
    pub override_extension: Duration,
    /// How long a controller-issued seek waits for its seek events.
    #[serde(with = "millis")]
    pub programmatic_seek_window: Duration,
    #[serde(with = "millis")]
    pub media_retry_interval: Duration,
    pub media_retry_budget: u32,
}

impl Default for SkipperConfig {
    fn default() -> Self {
        Self {
            seek_debounce: MIN_SEEK_DEBOUNCE,
            grace_period: Duration::from_secs(3),
            manual_seek_watch: Duration::from_secs(5),
            rewind_watch: Duration::from_secs(8),
            marker_watch: Duration::from_secs(10),
            override_extension: Duration::from_secs(5),
            programmatic_seek_window: Duration::from_secs(1),
            media_retry_interval: Duration::from_secs(1),
            media_retry_budget: 30,
        }
    }
}

impl SkipperConfig {
    /// Clamp values a hand-edited settings file could get wrong.
    pub fn sanitized(mut self) -> Self {
        if self.seek_debounce < MIN_SEEK_DEBOUNCE {
            self.seek_debounce = MIN_SEEK_DEBOUNCE;
        }
        if self.override_extension.is_zero() {
            self.override_extension = Self::default().override_extension;
        }
        if self.media_retry_interval.is_zero() {
            self.media_retry_interval = Self::default().media_retry_interval;
        }
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Process-level settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend_url: String,
    pub data_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub cache_ttl: chrono::Duration,
    pub debug: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let backend_url = std::env::var("SKIPPER_BACKEND_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let data_dir = std::env::var_os("SKIPPER_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("skipper")))
            .unwrap_or_else(|| std::env::temp_dir().join("skipper"));

        let fetch_timeout = std::env::var("SKIPPER_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        let cache_ttl_hours = std::env::var("SKIPPER_CACHE_TTL_HOURS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|hours| *hours >= 0)
            .unwrap_or(DEFAULT_CACHE_TTL_HOURS);

        let debug = std::env::var("SKIPPER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            data_dir,
            fetch_timeout: Duration::from_secs(fetch_timeout),
            cache_ttl: chrono::Duration::hours(cache_ttl_hours),
            debug,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("skipper.sqlite3")
    }
}
