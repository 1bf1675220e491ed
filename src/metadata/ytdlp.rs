//! yt-dlp metadata provider.

use super::MetadataProvider;
use crate::error::Result;
use crate::locator;
use crate::ytdlp::YtDlp;
use async_trait::async_trait;

/// Metadata provider that shells out to yt-dlp.
pub struct YtDlpMetadata {
    tool: YtDlp,
}

impl YtDlpMetadata {
    pub fn new() -> Self {
        Self { tool: YtDlp::new() }
    }

    pub fn with_tool(tool: YtDlp) -> Self {
        Self { tool }
    }
}

impl Default for YtDlpMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for YtDlpMetadata {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(&self, locator: &str) -> Result<serde_json::Value> {
        // Bare ids need a full URL; anything else is passed through untouched.
        let url = match locator::extract_video_id(locator) {
            Some((locator::VideoShape::BareId, id)) => locator::watch_url(&id),
            _ => locator.trim().to_string(),
        };
        self.tool.dump_json(&url, &["--no-playlist"]).await
    }

    async fn fetch_collection(&self, locator: &str) -> Result<serde_json::Value> {
        let url = match locator::extract_collection_id(locator) {
            Some(id) if !locator.contains("/playlist") => locator::collection_url(&id),
            _ => locator.trim().to_string(),
        };
        self.tool.dump_json(&url, &["--flat-playlist"]).await
    }
}
