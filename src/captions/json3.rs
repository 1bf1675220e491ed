//! Parser for YouTube's `json3` caption format.

use super::RawEntry;
use crate::error::ProviderError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: Option<u64>,
    #[serde(default)]
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 document into raw entries.
///
/// Events without segments (window and style events) are skipped. Entry
/// text is the concatenation of the event's segments; blank results are
/// left for normalization to drop.
pub fn parse_json3(body: &str) -> Result<Vec<RawEntry>, ProviderError> {
    if body.trim().is_empty() {
        return Err(ProviderError::NotFound("empty caption document".to_string()));
    }

    let doc: Json3Document = serde_json::from_str(body)
        .map_err(|e| ProviderError::Transient(format!("malformed json3 captions: {}", e)))?;

    Ok(doc
        .events
        .into_iter()
        .filter(|event| !event.segs.is_empty())
        .map(|event| RawEntry {
            start: event.t_start_ms.unwrap_or(0) as f64 / 1000.0,
            duration: event.d_duration_ms.map(|ms| ms as f64 / 1000.0),
            end: None,
            text: event.segs.into_iter().map(|s| s.utf8).collect(),
        })
        .collect())
}
