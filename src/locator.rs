//! Locator classification.
//!
//! Decides whether an input string refers to a single video or to a
//! collection (playlist) and extracts the identifiers it carries.

use crate::error::{Result, TubescribeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const WATCH_BASE: &str = "https://www.youtube.com/watch";
const PLAYLIST_BASE: &str = "https://www.youtube.com/playlist";

/// Video locator shapes, in precedence order.
static VIDEO_PATTERNS: LazyLock<Vec<(VideoShape, Regex)>> = LazyLock::new(|| {
    [
        (VideoShape::Watch, r"youtube\.com/watch\?(?:[^#\n]*&)?v=([^&\n?#/]+)"),
        (VideoShape::Short, r"youtu\.be/([^&\n?#/]+)"),
        (VideoShape::Embed, r"youtube(?:-nocookie)?\.com/embed/([^&\n?#/]+)"),
        (VideoShape::BarePath, r"youtube\.com/v/([^&\n?#/]+)"),
        (VideoShape::Shorts, r"youtube\.com/shorts/([^&\n?#/]+)"),
    ]
    .into_iter()
    .map(|(shape, pattern)| (shape, Regex::new(pattern).expect("valid video pattern")))
    .collect()
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid id pattern"));

static LIST_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]list=([^&#\n]+)").expect("valid list pattern"));

static PLAYLIST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/playlist(?:\?|$)").expect("valid playlist pattern"));

/// Syntactic shape a video identifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoShape {
    /// `youtube.com/watch?v=ID`
    Watch,
    /// `youtu.be/ID`
    Short,
    /// `youtube.com/embed/ID`
    Embed,
    /// `youtube.com/v/ID`
    BarePath,
    /// `youtube.com/shorts/ID`
    Shorts,
    /// A bare 11-character identifier.
    BareId,
}

/// What a locator refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    Video,
    Collection,
    Unrecognized,
}

impl std::fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocatorKind::Video => write!(f, "video"),
            LocatorKind::Collection => write!(f, "collection"),
            LocatorKind::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Result of classifying a locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: LocatorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl Classification {
    fn unrecognized() -> Self {
        Self {
            kind: LocatorKind::Unrecognized,
            video_id: None,
            collection_id: None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == LocatorKind::Video
    }

    pub fn is_collection(&self) -> bool {
        self.kind == LocatorKind::Collection
    }

    /// The video identifier, or `InvalidInput` if the locator carried none.
    pub fn require_video_id(&self, locator: &str) -> Result<&str> {
        self.video_id.as_deref().ok_or_else(|| {
            TubescribeError::InvalidInput(format!("Not a recognizable video locator: {}", locator))
        })
    }
}

/// Classify a locator as a video, a collection, or unrecognized.
///
/// A locator carrying both a video id and a collection marker (a watch URL
/// with `&list=`) is classified as a collection; the video id is still
/// reported.
pub fn classify(locator: &str) -> Classification {
    let locator = locator.trim();
    if locator.is_empty() {
        return Classification::unrecognized();
    }

    let video_id = extract_video_id(locator).map(|(_, id)| id);

    if has_collection_marker(locator) {
        return Classification {
            kind: LocatorKind::Collection,
            video_id,
            collection_id: extract_collection_id(locator),
        };
    }

    match video_id {
        Some(id) => Classification {
            kind: LocatorKind::Video,
            video_id: Some(id),
            collection_id: None,
        },
        None => Classification::unrecognized(),
    }
}

/// Extract a video id from the first matching shape.
pub fn extract_video_id(locator: &str) -> Option<(VideoShape, String)> {
    let locator = locator.trim();

    for (shape, pattern) in VIDEO_PATTERNS.iter() {
        if let Some(id) = pattern.captures(locator).and_then(|c| c.get(1)) {
            return Some((*shape, id.as_str().to_string()));
        }
    }

    if BARE_ID.is_match(locator) {
        return Some((VideoShape::BareId, locator.to_string()));
    }

    None
}

/// Extract the `list=` parameter value, if present.
pub fn extract_collection_id(locator: &str) -> Option<String> {
    LIST_PARAM
        .captures(locator)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether the locator carries a collection selector or a playlist path.
pub fn has_collection_marker(locator: &str) -> bool {
    LIST_PARAM.is_match(locator) || PLAYLIST_PATH.is_match(locator)
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    url::Url::parse_with_params(WATCH_BASE, &[("v", video_id)])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}?v={}", WATCH_BASE, video_id))
}

/// Canonical playlist URL for a collection id.
pub fn collection_url(collection_id: &str) -> String {
    url::Url::parse_with_params(PLAYLIST_BASE, &[("list", collection_id)])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}?list={}", PLAYLIST_BASE, collection_id))
}
