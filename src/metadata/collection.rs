//! Playlist resolution into ordered item references.

use super::{UNKNOWN_CHANNEL, UNKNOWN_PLAYLIST, UNKNOWN_TITLE};
use crate::locator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One video within a playlist (or a single classified video).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReference {
    pub id: String,
    pub url: String,
    pub title: String,
    /// 0-based, contiguous over the valid entries of the playlist.
    pub position: usize,
}

impl ItemReference {
    /// Reference for a standalone video.
    pub fn single(video_id: &str) -> Self {
        Self {
            id: video_id.to_string(),
            url: locator::watch_url(video_id),
            title: UNKNOWN_TITLE.to_string(),
            position: 0,
        }
    }
}

/// A resolved playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReference {
    pub id: String,
    pub title: String,
    pub owner_name: String,
    /// Count reported by the provider, or the number of valid entries.
    pub declared_item_count: usize,
    pub description: Option<String>,
    pub items: Vec<ItemReference>,
}

impl CollectionReference {
    /// Keep only the first `max_items` items.
    pub fn truncate(&mut self, max_items: usize) {
        self.items.truncate(max_items);
    }
}

/// Normalize a flat playlist map into a [`CollectionReference`].
///
/// Entries may be objects (`id`, `title`, `url`) or bare strings holding an
/// id or URL. Null entries and entries without an id are skipped, and
/// positions are assigned over the surviving entries only.
pub fn normalize_collection(raw: &Value, collection_id: Option<&str>) -> CollectionReference {
    let entries = raw["entries"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    let items: Vec<ItemReference> = entries
        .iter()
        .filter_map(parse_entry)
        .enumerate()
        .map(|(position, (id, url, title))| ItemReference {
            id,
            url,
            title,
            position,
        })
        .collect();

    let declared_item_count = raw["playlist_count"]
        .as_u64()
        .map(|c| c as usize)
        .unwrap_or(items.len());

    let id = raw["id"]
        .as_str()
        .or(collection_id)
        .unwrap_or("Unknown")
        .to_string();

    CollectionReference {
        id,
        title: raw["title"].as_str().unwrap_or(UNKNOWN_PLAYLIST).to_string(),
        owner_name: raw["uploader"]
            .as_str()
            .or_else(|| raw["channel"].as_str())
            .unwrap_or(UNKNOWN_CHANNEL)
            .to_string(),
        declared_item_count,
        description: raw["description"].as_str().map(|s| s.to_string()),
        items,
    }
}

fn parse_entry(entry: &Value) -> Option<(String, String, String)> {
    match entry {
        Value::Object(_) => {
            let id = entry["id"].as_str().filter(|s| !s.is_empty())?.to_string();
            let url = entry["url"]
                .as_str()
                .filter(|u| u.starts_with("http"))
                .map(|u| u.to_string())
                .unwrap_or_else(|| locator::watch_url(&id));
            let title = entry["title"].as_str().unwrap_or(UNKNOWN_TITLE).to_string();
            Some((id, url, title))
        }
        Value::String(s) if !s.trim().is_empty() => {
            let s = s.trim();
            let id = locator::extract_video_id(s)
                .map(|(_, id)| id)
                .unwrap_or_else(|| s.to_string());
            let url = if s.starts_with("http") {
                s.to_string()
            } else {
                locator::watch_url(s)
            };
            Some((id, url, UNKNOWN_TITLE.to_string()))
        }
        _ => None,
    }
}
