//! Video metadata retrieval.
//!
//! A [`MetadataProvider`] returns the raw attribute map an external tool
//! produces; [`MetadataFetcher`] normalizes it into [`ItemMetadata`] and
//! substitutes sentinel values when the provider fails, so batch callers
//! never have to branch on missing data.

mod collection;
mod ytdlp;

pub use collection::{normalize_collection, CollectionReference, ItemReference};
pub use ytdlp::YtDlpMetadata;

use crate::error::{Result, TubescribeError};
use crate::locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
pub const UNKNOWN_PLAYLIST: &str = "Unknown Playlist";

/// Source of raw metadata for videos and playlists.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Fetch the raw attribute map for a single video.
    async fn fetch(&self, locator: &str) -> Result<serde_json::Value>;

    /// Fetch the raw (flat) attribute map for a playlist.
    async fn fetch_collection(&self, locator: &str) -> Result<serde_json::Value>;
}

/// Normalized descriptive metadata for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    /// Upload date as `YYYY-MM-DD`.
    pub upload_date: Option<String>,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl ItemMetadata {
    /// Metadata used when the provider could not be reached or parsed.
    pub fn sentinel(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: UNKNOWN_TITLE.to_string(),
            channel_name: UNKNOWN_CHANNEL.to_string(),
            upload_date: None,
            duration_seconds: Some(0),
            view_count: Some(0),
            like_count: Some(0),
            description: None,
            thumbnail_url: None,
        }
    }

    /// Whether this value carries the sentinel title and channel.
    pub fn is_sentinel(&self) -> bool {
        self.title == UNKNOWN_TITLE && self.channel_name == UNKNOWN_CHANNEL
    }

    /// Normalize a raw provider map.
    pub fn from_raw(fallback_id: &str, raw: &serde_json::Value) -> Self {
        let video_id = raw["id"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_id)
            .to_string();

        let title = raw["title"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();

        let channel_name = raw["channel"]
            .as_str()
            .or_else(|| raw["uploader"].as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_CHANNEL)
            .to_string();

        let upload_date = raw["upload_date"].as_str().and_then(format_upload_date);

        Self {
            video_id,
            title,
            channel_name,
            upload_date,
            duration_seconds: as_count(&raw["duration"]),
            view_count: as_count(&raw["view_count"]),
            like_count: as_count(&raw["like_count"]),
            description: raw["description"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            thumbnail_url: raw["thumbnail"].as_str().map(|s| s.to_string()),
        }
    }
}

/// Non-negative integer from a JSON number (floats are truncated).
fn as_count(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// yt-dlp reports upload dates as YYYYMMDD.
fn format_upload_date(raw: &str) -> Option<String> {
    if raw.len() != 8 {
        return None;
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Metadata plus the failure that forced sentinel values, if any.
#[derive(Debug, Clone)]
pub struct MetadataReport {
    pub metadata: ItemMetadata,
    pub failure: Option<String>,
}

impl MetadataReport {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetches and normalizes metadata through a [`MetadataProvider`].
pub struct MetadataFetcher {
    provider: Arc<dyn MetadataProvider>,
}

impl MetadataFetcher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Fetcher backed by yt-dlp.
    pub fn ytdlp() -> Self {
        Self::new(Arc::new(YtDlpMetadata::new()))
    }

    /// Fetch metadata, never failing.
    ///
    /// Provider failures are logged and yield [`ItemMetadata::sentinel`].
    pub async fn fetch_metadata(&self, locator: &str) -> ItemMetadata {
        self.fetch_metadata_report(locator).await.metadata
    }

    /// Fetch metadata and report whether sentinel values had to be used.
    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    pub async fn fetch_metadata_report(&self, locator: &str) -> MetadataReport {
        let fallback_id = fallback_id(locator);

        match self.provider.fetch(locator).await {
            Ok(raw) => {
                debug!("Fetched metadata for {}", fallback_id);
                MetadataReport {
                    metadata: ItemMetadata::from_raw(&fallback_id, &raw),
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Metadata fetch failed for {}: {}", locator, e);
                MetadataReport {
                    metadata: ItemMetadata::sentinel(&fallback_id),
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Fetch metadata, propagating provider failures.
    pub async fn fetch_metadata_strict(&self, locator: &str) -> Result<ItemMetadata> {
        let raw = self.provider.fetch(locator).await?;
        Ok(ItemMetadata::from_raw(&fallback_id(locator), &raw))
    }

    /// Resolve a playlist locator into its ordered item references.
    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    pub async fn resolve_collection(&self, locator: &str) -> Result<CollectionReference> {
        let classification = locator::classify(locator);
        if !classification.is_collection() {
            return Err(TubescribeError::InvalidInput(format!(
                "Not a playlist locator: {}",
                locator
            )));
        }

        let raw = self.provider.fetch_collection(locator).await?;
        if let Some(kind) = raw["_type"].as_str() {
            if kind != "playlist" {
                return Err(TubescribeError::MetadataSource(format!(
                    "Expected a playlist but provider returned '{}'",
                    kind
                )));
            }
        }

        let collection = normalize_collection(&raw, classification.collection_id.as_deref());
        debug!(
            "Resolved playlist {} with {} items (declared {})",
            collection.id,
            collection.items.len(),
            collection.declared_item_count
        );
        Ok(collection)
    }
}

fn fallback_id(locator: &str) -> String {
    locator::extract_video_id(locator)
        .map(|(_, id)| id)
        .unwrap_or_else(|| locator.trim().to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory provider keyed by video id.
    #[derive(Default)]
    pub struct MemoryMetadata {
        pub videos: HashMap<String, serde_json::Value>,
        pub collection: Option<serde_json::Value>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MemoryMetadata {
        pub fn with_video(mut self, id: &str, title: &str) -> Self {
            self.videos.insert(
                id.to_string(),
                serde_json::json!({
                    "id": id,
                    "title": title,
                    "channel": "Test Channel",
                    "upload_date": "20240115",
                    "duration": 125.0,
                    "view_count": 1000,
                    "like_count": 50,
                    "description": "A description",
                    "thumbnail": format!("https://i.ytimg.com/vi/{}/hq.jpg", id),
                }),
            );
            self
        }

        pub fn with_collection(mut self, raw: serde_json::Value) -> Self {
            self.collection = Some(raw);
            self
        }
    }

    #[async_trait]
    impl MetadataProvider for MemoryMetadata {
        fn name(&self) -> &str {
            "memory"
        }

        async fn fetch(&self, locator: &str) -> Result<serde_json::Value> {
            self.calls.lock().unwrap().push(locator.to_string());
            let id = fallback_id(locator);
            self.videos
                .get(&id)
                .cloned()
                .ok_or_else(|| TubescribeError::VideoNotFound(id))
        }

        async fn fetch_collection(&self, _locator: &str) -> Result<serde_json::Value> {
            self.collection
                .clone()
                .ok_or_else(|| TubescribeError::MetadataSource("no playlist".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryMetadata;
    use super::*;

    #[tokio::test]
    async fn test_fetch_normalizes() {
        let provider = MemoryMetadata::default().with_video("dQw4w9WgXcQ", "Song");
        let fetcher = MetadataFetcher::new(Arc::new(provider));

        let meta = fetcher
            .fetch_metadata("https://youtu.be/dQw4w9WgXcQ")
            .await;
        assert_eq!(meta.video_id, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Song");
        assert_eq!(meta.channel_name, "Test Channel");
        assert_eq!(meta.upload_date.as_deref(), Some("2024-01-15"));
        assert_eq!(meta.duration_seconds, Some(125));
        assert_eq!(meta.like_count, Some(50));
    }

    #[tokio::test]
    async fn test_failure_yields_sentinel() {
        let fetcher = MetadataFetcher::new(Arc::new(MemoryMetadata::default()));

        let report = fetcher.fetch_metadata_report("dQw4w9WgXcQ").await;
        assert!(!report.is_ok());
        assert_eq!(report.metadata, ItemMetadata::sentinel("dQw4w9WgXcQ"));
        assert!(report.metadata.is_sentinel());
        assert_eq!(report.metadata.view_count, Some(0));
    }

    #[tokio::test]
    async fn test_strict_propagates() {
        let fetcher = MetadataFetcher::new(Arc::new(MemoryMetadata::default()));
        let result = fetcher.fetch_metadata_strict("dQw4w9WgXcQ").await;
        assert!(matches!(result, Err(TubescribeError::VideoNotFound(_))));
    }

    #[test]
    fn test_from_raw_defaults() {
        let raw = serde_json::json!({ "uploader": "Someone", "upload_date": "bad" });
        let meta = ItemMetadata::from_raw("abc", &raw);
        assert_eq!(meta.video_id, "abc");
        assert_eq!(meta.title, UNKNOWN_TITLE);
        assert_eq!(meta.channel_name, "Someone");
        assert!(meta.upload_date.is_none());
        assert!(meta.view_count.is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejects_video_locator() {
        let fetcher = MetadataFetcher::new(Arc::new(MemoryMetadata::default()));
        let result = fetcher
            .resolve_collection("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await;
        assert!(matches!(result, Err(TubescribeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_non_playlist_payload() {
        let provider = MemoryMetadata::default()
            .with_collection(serde_json::json!({ "_type": "video", "id": "x" }));
        let fetcher = MetadataFetcher::new(Arc::new(provider));
        let result = fetcher
            .resolve_collection("https://www.youtube.com/playlist?list=PLx")
            .await;
        assert!(matches!(result, Err(TubescribeError::MetadataSource(_))));
    }
}
