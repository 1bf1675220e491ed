//! Legacy caption provider over the public timedtext endpoint.

use super::{parse_json3, CaptionProvider, RawEntry};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";

/// Single-call provider: no track listing, only `get_transcript`.
pub struct TimedTextCaptions {
    http: reqwest::Client,
    base_url: String,
}

impl TimedTextCaptions {
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            http: builder.build().unwrap_or_default(),
            base_url: TIMEDTEXT_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_language(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<RawEntry>, ProviderError> {
        let mut query = vec![("v", video_id), ("fmt", "json3")];
        if let Some(lang) = language {
            query.push(("lang", lang));
        }

        let body = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_json3(&body)
    }
}

#[async_trait]
impl CaptionProvider for TimedTextCaptions {
    fn name(&self) -> &str {
        "timedtext"
    }

    async fn get_transcript(
        &self,
        video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<Vec<RawEntry>, ProviderError> {
        let Some(languages) = languages else {
            return self.fetch_language(video_id, None).await;
        };

        let mut last_error = ProviderError::NotFound(format!("no languages requested for {}", video_id));
        for lang in languages {
            match self.fetch_language(video_id, Some(lang)).await {
                Ok(entries) if !entries.is_empty() => return Ok(entries),
                Ok(_) => {
                    last_error = ProviderError::NotFound(format!("no {} captions", lang));
                }
                Err(e) => {
                    debug!("timedtext {} failed: {}", lang, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
