//! In-memory caption providers for tests.

use super::{CaptionProvider, ProviderTrack, RawEntry, TrackHandle, TrackOrigin};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Modern provider holding fixed tracks.
#[derive(Default)]
pub struct ModernMock {
    tracks: Vec<(TrackHandle, Vec<RawEntry>)>,
    default: Option<Vec<RawEntry>>,
    listed_only: bool,
    pub fetch_calls: AtomicUsize,
}

impl ModernMock {
    pub fn manual(self, language: &str, entries: Vec<RawEntry>) -> Self {
        self.track(language, TrackOrigin::Manual, entries)
    }

    pub fn generated(self, language: &str, entries: Vec<RawEntry>) -> Self {
        self.track(language, TrackOrigin::Generated, entries)
    }

    /// Track returned for a language-less request; never listed.
    pub fn default_track(mut self, entries: Vec<RawEntry>) -> Self {
        self.default = Some(entries);
        self
    }

    /// Only reachable through listing; direct fetches find nothing.
    pub fn listed_only(mut self) -> Self {
        self.listed_only = true;
        self
    }

    fn track(mut self, language: &str, origin: TrackOrigin, entries: Vec<RawEntry>) -> Self {
        let handle = TrackHandle {
            language: language.to_string(),
            name: None,
            origin,
            url: None,
        };
        self.tracks.push((handle, entries));
        self
    }

    fn provider_track(handle: &TrackHandle, entries: &[RawEntry]) -> ProviderTrack {
        ProviderTrack {
            language: Some(handle.language.clone()),
            origin: Some(handle.origin),
            entries: entries.to_vec(),
        }
    }
}

#[async_trait]
impl CaptionProvider for ModernMock {
    fn name(&self) -> &str {
        "modern-mock"
    }

    async fn fetch_track(
        &self,
        _video_id: &str,
        languages: &[String],
    ) -> Result<ProviderTrack, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.listed_only {
            return Err(ProviderError::NotFound("direct fetch disabled".to_string()));
        }

        if languages.is_empty() {
            return match &self.default {
                Some(entries) => Ok(ProviderTrack {
                    language: None,
                    origin: None,
                    entries: entries.clone(),
                }),
                None => Err(ProviderError::NotFound("no default track".to_string())),
            };
        }

        for lang in languages {
            for origin in [TrackOrigin::Manual, TrackOrigin::Generated] {
                if let Some((handle, entries)) = self
                    .tracks
                    .iter()
                    .find(|(h, _)| h.origin == origin && h.language == *lang)
                {
                    return Ok(Self::provider_track(handle, entries));
                }
            }
        }
        Err(ProviderError::NotFound(format!("no track for {:?}", languages)))
    }

    async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        Ok(self.tracks.iter().map(|(h, _)| h.clone()).collect())
    }

    async fn fetch_handle(
        &self,
        _video_id: &str,
        handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError> {
        self.tracks
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(h, entries)| Self::provider_track(h, entries))
            .ok_or_else(|| ProviderError::NotFound(handle.language.clone()))
    }
}

/// Legacy provider: only `get_transcript` works.
#[derive(Default)]
pub struct LegacyOnly {
    tracks: Vec<(String, Vec<RawEntry>)>,
    reject_multi_language: bool,
    modern_probes: AtomicUsize,
}

impl LegacyOnly {
    /// Fails any request naming more than one language.
    pub fn rejecting_multi_language() -> Self {
        Self {
            reject_multi_language: true,
            ..Self::default()
        }
    }

    pub fn with_track(mut self, language: &str, entries: Vec<RawEntry>) -> Self {
        self.tracks.push((language.to_string(), entries));
        self
    }

    /// Number of times the modern interface was tried.
    pub fn modern_probes(&self) -> usize {
        self.modern_probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionProvider for LegacyOnly {
    fn name(&self) -> &str {
        "legacy-mock"
    }

    async fn fetch_track(
        &self,
        _video_id: &str,
        _languages: &[String],
    ) -> Result<ProviderTrack, ProviderError> {
        self.modern_probes.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Unsupported("fetch_track"))
    }

    async fn get_transcript(
        &self,
        _video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<Vec<RawEntry>, ProviderError> {
        match languages {
            Some(langs) if self.reject_multi_language && langs.len() > 1 => Err(
                ProviderError::Transient("multi-language request rejected".to_string()),
            ),
            Some(langs) => langs
                .iter()
                .find_map(|lang| {
                    self.tracks
                        .iter()
                        .find(|(l, _)| l == lang)
                        .map(|(_, entries)| entries.clone())
                })
                .ok_or_else(|| ProviderError::NotFound(format!("{:?}", langs))),
            None => Err(ProviderError::NotFound("no default transcript".to_string())),
        }
    }
}

/// Modern provider that never answers in time.
pub struct SlowProvider;

#[async_trait]
impl CaptionProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow-mock"
    }

    async fn fetch_track(
        &self,
        _video_id: &str,
        _languages: &[String],
    ) -> Result<ProviderTrack, ProviderError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ProviderTrack::default())
    }

    async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}
