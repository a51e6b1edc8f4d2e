use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::IntervalSource;
use crate::{
    error::FetchError,
    models::{SkipInterval, UserPreferences, VideoId},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Serialize)]
struct ProcessVideoRequest<'a> {
    video_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_preferences: Option<&'a UserPreferences>,
}

#[derive(Debug, Deserialize)]
struct RemoteSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessResult {
    #[serde(default)]
    remove: Vec<RemoteSegment>,
    #[serde(default)]
    processing_time: Option<f64>,
    #[serde(default)]
    total_duration: Option<f64>,
    #[serde(default)]
    skip_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Talks to the transcript analysis backend over HTTP.
pub struct HttpIntervalSource {
    client: Client,
    base_url: String,
}

impl HttpIntervalSource {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl IntervalSource for HttpIntervalSource {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferences: Option<&UserPreferences>,
    ) -> Result<Vec<SkipInterval>, FetchError> {
        let request = ProcessVideoRequest {
            video_id: video_id.as_str(),
            user_preferences: preferences,
        };

        let response = self
            .client
            .post(self.url("/process_video"))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(status.as_u16(), &body));
        }

        let result: ProcessResult = response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;

        log_info!(
            "analysis for {video_id}: {} segments, {:.1}% of {:.0}s flagged, took {:.2}s",
            result.remove.len(),
            result.skip_percentage.unwrap_or(0.0),
            result.total_duration.unwrap_or(0.0),
            result.processing_time.unwrap_or(0.0),
        );

        Ok(into_intervals(result))
    }
}

fn into_intervals(result: ProcessResult) -> Vec<SkipInterval> {
    result
        .remove
        .into_iter()
        .map(|segment| {
            if let Some(reason) = segment.reason.as_deref() {
                log_debug!(
                    "segment {:.2}-{:.2} ({reason}, confidence {:.2})",
                    segment.start,
                    segment.end,
                    segment.confidence.unwrap_or(1.0)
                );
            }
            SkipInterval::new(segment.start, segment.end)
        })
        .collect()
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

fn remote_error(status: u16, body: &str) -> FetchError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.detail)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP error! status: {status}")
            } else {
                trimmed.to_string()
            }
        });
    FetchError::Remote { status, detail }
}
