//! Modern caption provider backed by yt-dlp's subtitle listing.

use super::{parse_json3, CaptionProvider, ProviderTrack, TrackHandle, TrackOrigin};
use crate::error::{ProviderError, TubescribeError};
use crate::locator;
use crate::ytdlp::YtDlp;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
struct SubtitleListing {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<SubtitleFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<SubtitleFormat>>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFormat {
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Lists tracks with `yt-dlp` and downloads them in json3 format.
///
/// The listing of the most recent video is kept, so the strategies of one
/// acquisition run share a single `yt-dlp` invocation.
pub struct YtDlpCaptions {
    tool: YtDlp,
    http: reqwest::Client,
    last_listing: Mutex<Option<(String, Vec<TrackHandle>)>>,
}

impl YtDlpCaptions {
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            tool: YtDlp::new().with_timeout(timeout),
            http: builder.build().unwrap_or_default(),
            last_listing: Mutex::new(None),
        }
    }

    pub fn with_tool(mut self, tool: YtDlp) -> Self {
        self.tool = tool;
        self
    }

    async fn listing(&self, video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        if let Some(handles) = self.cached_listing(video_id) {
            debug!("Reusing track listing for {}", video_id);
            return Ok(handles);
        }

        let handles = self.run_listing(video_id).await?;
        if let Ok(mut cache) = self.last_listing.lock() {
            *cache = Some((video_id.to_string(), handles.clone()));
        }
        Ok(handles)
    }

    fn cached_listing(&self, video_id: &str) -> Option<Vec<TrackHandle>> {
        let cache = self.last_listing.lock().ok()?;
        match cache.as_ref() {
            Some((id, handles)) if id == video_id => Some(handles.clone()),
            _ => None,
        }
    }

    async fn run_listing(&self, video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        let url = locator::watch_url(video_id);
        let json = self
            .tool
            .dump_json(&url, &["--no-playlist"])
            .await
            .map_err(|e| match e {
                TubescribeError::VideoNotFound(msg) => ProviderError::NotFound(msg),
                other => ProviderError::Transient(other.to_string()),
            })?;

        let listing: SubtitleListing = serde_json::from_value(json)
            .map_err(|e| ProviderError::Transient(format!("unexpected yt-dlp output: {}", e)))?;
        Ok(handles_from_listing(listing))
    }

    async fn download(&self, handle: &TrackHandle) -> Result<ProviderTrack, ProviderError> {
        let url = handle
            .url
            .as_deref()
            .ok_or_else(|| ProviderError::NotFound(format!("no json3 url for {}", handle.language)))?;

        debug!("Downloading {} captions ({:?})", handle.language, handle.origin);
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(ProviderTrack {
            language: Some(handle.language.clone()),
            origin: Some(handle.origin),
            entries: parse_json3(&body)?,
        })
    }
}

#[async_trait]
impl CaptionProvider for YtDlpCaptions {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self, languages))]
    async fn fetch_track(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<ProviderTrack, ProviderError> {
        let handles = self.listing(video_id).await?;

        match choose_handle(&handles, languages) {
            Some(handle) => self.download(handle).await,
            None => Err(ProviderError::NotFound(format!(
                "no track for {:?} among {} listed",
                languages,
                handles.len()
            ))),
        }
    }

    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TrackHandle>, ProviderError> {
        self.listing(video_id).await
    }

    async fn fetch_handle(
        &self,
        _video_id: &str,
        handle: &TrackHandle,
    ) -> Result<ProviderTrack, ProviderError> {
        self.download(handle).await
    }
}

/// First preferred language with a track, manual before generated. Regional
/// variants match their base language. No preference takes the first manual
/// track, else the first listed.
fn choose_handle<'a>(handles: &'a [TrackHandle], languages: &[String]) -> Option<&'a TrackHandle> {
    if languages.is_empty() {
        return handles
            .iter()
            .find(|h| h.origin == TrackOrigin::Manual)
            .or_else(|| handles.first());
    }

    languages.iter().find_map(|lang| {
        [TrackOrigin::Manual, TrackOrigin::Generated]
            .into_iter()
            .find_map(|origin| {
                handles
                    .iter()
                    .find(|h| h.origin == origin && h.matches_language(lang))
            })
    })
}

/// Manual tracks first, then generated ones; live chat replays are skipped.
fn handles_from_listing(listing: SubtitleListing) -> Vec<TrackHandle> {
    let manual = listing
        .subtitles
        .into_iter()
        .map(|(lang, formats)| (lang, formats, TrackOrigin::Manual));
    let generated = listing
        .automatic_captions
        .into_iter()
        .map(|(lang, formats)| (lang, formats, TrackOrigin::Generated));

    manual
        .chain(generated)
        .filter(|(lang, _, _)| lang != "live_chat")
        .filter_map(|(language, formats, origin)| {
            let json3 = formats
                .iter()
                .find(|f| f.ext.as_deref() == Some("json3") && f.url.is_some())?;
            Some(TrackHandle {
                language,
                name: json3.name.clone().or_else(|| formats.iter().find_map(|f| f.name.clone())),
                origin,
                url: json3.url.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handles_from_listing() {
        let listing: SubtitleListing = serde_json::from_value(json!({
            "id": "abc",
            "subtitles": {
                "live_chat": [{"ext": "json", "url": "https://chat"}],
                "en": [
                    {"ext": "vtt", "url": "https://x/en.vtt", "name": "English"},
                    {"ext": "json3", "url": "https://x/en.json3"}
                ]
            },
            "automatic_captions": {
                "ko": [{"ext": "json3", "url": "https://x/ko.json3", "name": "Korean"}],
                "fr": [{"ext": "srv1", "url": "https://x/fr.srv1"}]
            }
        }))
        .unwrap();

        let handles = handles_from_listing(listing);
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].language, "en");
        assert_eq!(handles[0].origin, TrackOrigin::Manual);
        assert_eq!(handles[0].name.as_deref(), Some("English"));
        assert_eq!(handles[0].url.as_deref(), Some("https://x/en.json3"));
        assert_eq!(handles[1].language, "ko");
        assert_eq!(handles[1].origin, TrackOrigin::Generated);
    }

    #[test]
    fn test_missing_sections() {
        let listing: SubtitleListing = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert!(handles_from_listing(listing).is_empty());
    }

    fn handle(language: &str, origin: TrackOrigin) -> TrackHandle {
        TrackHandle {
            language: language.to_string(),
            name: None,
            origin,
            url: Some(format!("https://x/{}.json3", language)),
        }
    }

    #[test]
    fn test_choose_handle_accepts_regional_variant() {
        let handles = vec![
            handle("en-US", TrackOrigin::Manual),
            handle("ko", TrackOrigin::Generated),
        ];

        let chosen = choose_handle(&handles, &["en".to_string()]).unwrap();
        assert_eq!(chosen.language, "en-US");

        let chosen = choose_handle(&handles, &["fr".to_string(), "ko".to_string()]).unwrap();
        assert_eq!(chosen.language, "ko");

        assert!(choose_handle(&handles, &["e".to_string()]).is_none());
    }

    #[test]
    fn test_choose_handle_prefers_manual() {
        let handles = vec![
            handle("en", TrackOrigin::Generated),
            handle("en-GB", TrackOrigin::Manual),
        ];
        let chosen = choose_handle(&handles, &["en".to_string()]).unwrap();
        assert_eq!(chosen.origin, TrackOrigin::Manual);

        let chosen = choose_handle(&handles, &[]).unwrap();
        assert_eq!(chosen.language, "en-GB");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listing_is_reused_for_same_video() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = dir.path().join("fake-yt-dlp");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho run >> '{}'\necho '{{\"subtitles\": {{\"en\": [{{\"ext\": \"json3\", \"url\": \"https://x/en.json3\"}}]}}}}'\n",
                counter.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let provider = YtDlpCaptions::new(None)
            .with_tool(YtDlp::new().with_binary(script.to_string_lossy().to_string()));
        let runs = || std::fs::read_to_string(&counter).unwrap().lines().count();

        assert_eq!(provider.list_tracks("abc123").await.unwrap().len(), 1);
        assert_eq!(provider.list_tracks("abc123").await.unwrap().len(), 1);
        assert_eq!(runs(), 1);

        provider.list_tracks("xyz789").await.unwrap();
        assert_eq!(runs(), 2);
    }

    #[tokio::test]
    async fn test_missing_tool_is_transient() {
        let provider = YtDlpCaptions::new(None).with_tool(YtDlp::new().with_binary("no-such-yt-dlp-here"));
        let result = provider.list_tracks("abc123").await;
        assert!(matches!(result, Err(ProviderError::Transient(_))));
    }
}
