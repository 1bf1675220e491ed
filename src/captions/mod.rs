//! Caption acquisition.
//!
//! Captions come from a [`CaptionProvider`]. Providers exist in two
//! incompatible interface generations:
//!
//! - **Modern**: `fetch_track` by language list, plus `list_tracks` /
//!   `fetch_handle` for enumerating every available track.
//! - **Legacy**: a single `get_transcript` call with an optional language
//!   list and no enumeration.
//!
//! A provider implements whichever operations it supports; the rest keep
//! their default body, which reports [`ProviderError::Unsupported`]. The
//! [`CaptionEngine`] probes the generation once, wraps the provider in the
//! matching [`CaptionProviderAdapter`], and walks a fixed list of
//! strategies until one yields a track.

mod adapter;
mod engine;
mod json3;
mod timedtext;
mod ytdlp;

pub use adapter::{CaptionProviderAdapter, Generation, LegacyAdapter, ModernAdapter};
pub use engine::{CaptionEngine, CaptionOutcome, Strategy, StrategyAttempt, StrategyOutcome};
pub use json3::parse_json3;
pub use timedtext::TimedTextCaptions;
pub use ytdlp::YtDlpCaptions;

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One timestamped caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    pub text: String,
}

impl CaptionEntry {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Whether a track was written by a person or produced by speech recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackOrigin {
    Manual,
    Generated,
}

/// A non-empty, start-ordered caption sequence and how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub entries: Vec<CaptionEntry>,
    /// Strategy that produced the track.
    pub strategy: Strategy,
    /// Language actually returned, when the provider reports it.
    pub language: Option<String>,
    pub origin: Option<TrackOrigin>,
    pub generation: Generation,
}

impl CaptionTrack {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last entry, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.entries.iter().map(CaptionEntry::end).fold(0.0, f64::max)
    }

    /// Entry texts joined by single spaces.
    pub fn text(&self) -> String {
        combine_text(&self.entries)
    }
}

/// Join entry texts with single spaces, skipping blank ones.
pub fn combine_text(entries: &[CaptionEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A track advertised by a modern provider's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHandle {
    pub language: String,
    pub name: Option<String>,
    pub origin: TrackOrigin,
    /// Provider-specific locator used to download the track.
    pub url: Option<String>,
}

impl TrackHandle {
    /// Exact language match, or a regional variant of it (`en` matches `en-US`).
    pub fn matches_language(&self, preferred: &str) -> bool {
        let lang = self.language.to_ascii_lowercase();
        let preferred = preferred.to_ascii_lowercase();
        lang == preferred || lang.starts_with(&format!("{}-", preferred))
    }
}

/// A caption entry as a provider reports it, before normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawEntry {
    pub start: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    pub text: String,
}

impl RawEntry {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration: Some(duration),
            end: None,
            text: text.into(),
        }
    }
}

/// A provider-side track with whatever provenance it exposes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderTrack {
    pub language: Option<String>,
    pub origin: Option<TrackOrigin>,
    pub entries: Vec<RawEntry>,
}

/// Raw caption backend.
///
/// Every operation defaults to [`ProviderError::Unsupported`]; a modern
/// provider overrides `fetch_track`, `list_tracks` and `fetch_handle`, a
/// legacy one overrides `get_transcript`.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the best track for the ordered language list. An empty list
    /// asks for the provider's default track.
    async fn fetch_track(
        &self,
        _video_id: &str,
        _languages: &[String],
    ) -> Result<ProviderTrack, ProviderError> {
        Err(ProviderError::Unsupported("fetch_track"))
    }

    /// Enumerate every available track.
    async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        Err(ProviderError::Unsupported("list_tracks"))
    }

    /// Download one listed track.
    async fn fetch_handle(
        &self,
        _video_id: &str,
        _handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError> {
        Err(ProviderError::Unsupported("fetch_handle"))
    }

    /// Legacy single-call interface.
    async fn get_transcript(
        &self,
        _video_id: &str,
        _languages: Option<&[String]>,
    ) -> Result<Vec<RawEntry>, ProviderError> {
        Err(ProviderError::Unsupported("get_transcript"))
    }
}

/// Convert raw entries into canonical, start-ordered caption entries.
///
/// Blank texts are dropped, negative or non-finite times become zero, a
/// missing duration is derived from `end` when present, and common HTML
/// entities are decoded.
pub fn normalize_entries(raw: Vec<RawEntry>) -> Vec<CaptionEntry> {
    let mut entries: Vec<CaptionEntry> = raw
        .into_iter()
        .filter_map(|e| {
            let text = clean_text(&e.text);
            if text.is_empty() {
                return None;
            }
            let start = non_negative(e.start);
            let duration = e
                .duration
                .or_else(|| e.end.map(|end| end - start))
                .map(non_negative)
                .unwrap_or(0.0);
            Some(CaptionEntry {
                start,
                duration,
                text,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.start.total_cmp(&b.start));
    entries
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn clean_text(text: &str) -> String {
    let decoded = text
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) mod testing;
