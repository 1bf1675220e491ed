//! Uniform view over the two caption provider generations.

use super::{CaptionProvider, ProviderTrack, TrackHandle};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider interface generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Modern,
    Legacy,
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generation::Modern => write!(f, "modern"),
            Generation::Legacy => write!(f, "legacy"),
        }
    }
}

/// What the engine's strategies operate against.
#[async_trait]
pub trait CaptionProviderAdapter: Send + Sync {
    fn generation(&self) -> Generation;

    /// Fetch a track for the ordered languages, or the default track for `None`.
    async fn fetch(
        &self,
        video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<ProviderTrack, ProviderError>;

    /// Enumerate available tracks.
    async fn list(&self, video_id: &str) -> Result<Vec<TrackHandle>, ProviderError>;

    /// Fetch a track returned by [`list`](Self::list).
    async fn fetch_listed(
        &self,
        video_id: &str,
        handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError>;
}

/// Adapter over `fetch_track` / `list_tracks` / `fetch_handle`.
pub struct ModernAdapter {
    provider: Arc<dyn CaptionProvider>,
}

impl ModernAdapter {
    pub fn new(provider: Arc<dyn CaptionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CaptionProviderAdapter for ModernAdapter {
    fn generation(&self) -> Generation {
        Generation::Modern
    }

    async fn fetch(
        &self,
        video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<ProviderTrack, ProviderError> {
        self.provider
            .fetch_track(video_id, languages.unwrap_or(&[]))
            .await
    }

    async fn list(&self, video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        self.provider.list_tracks(video_id).await
    }

    async fn fetch_listed(
        &self,
        video_id: &str,
        handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError> {
        let mut track = self.provider.fetch_handle(video_id, handle).await?;
        track.language.get_or_insert_with(|| handle.language.clone());
        track.origin.get_or_insert(handle.origin);
        Ok(track)
    }
}

/// Adapter over the single `get_transcript` call.
pub struct LegacyAdapter {
    provider: Arc<dyn CaptionProvider>,
}

impl LegacyAdapter {
    pub fn new(provider: Arc<dyn CaptionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CaptionProviderAdapter for LegacyAdapter {
    fn generation(&self) -> Generation {
        Generation::Legacy
    }

    async fn fetch(
        &self,
        video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<ProviderTrack, ProviderError> {
        let entries = self.provider.get_transcript(video_id, languages).await?;

        // The legacy call does not say which language it picked; a
        // single-language request is the only case where it is known.
        let language = match languages {
            Some([only]) => Some(only.clone()),
            _ => None,
        };

        Ok(ProviderTrack {
            language,
            origin: None,
            entries,
        })
    }

    async fn list(&self, _video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        Err(ProviderError::Unsupported("list_tracks"))
    }

    async fn fetch_listed(
        &self,
        _video_id: &str,
        _handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError> {
        Err(ProviderError::Unsupported("fetch_handle"))
    }
}
