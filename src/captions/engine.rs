//! Multi-strategy caption acquisition.

use super::adapter::{CaptionProviderAdapter, Generation, LegacyAdapter, ModernAdapter};
use super::{
    normalize_entries, CaptionEntry, CaptionProvider, CaptionTrack, ProviderTrack,
    TimedTextCaptions, TrackHandle, TrackOrigin, YtDlpCaptions,
};
use crate::config::{CaptionBackendKind, CaptionSettings};
use crate::error::{ProviderError, TubescribeError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Acquisition strategies, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One request with the full preference list.
    AllLanguages,
    /// One request per preferred language, in order.
    EachLanguage,
    /// One request without a language constraint.
    ProviderDefault,
    /// Enumerate tracks and pick a preferred-language one, manual first.
    PreferredListed,
    /// Enumerate tracks and take the first one.
    FirstListed,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::AllLanguages,
        Strategy::EachLanguage,
        Strategy::ProviderDefault,
        Strategy::PreferredListed,
        Strategy::FirstListed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::AllLanguages => "all_languages",
            Strategy::EachLanguage => "each_language",
            Strategy::ProviderDefault => "provider_default",
            Strategy::PreferredListed => "preferred_listed",
            Strategy::FirstListed => "first_listed",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Success(CaptionTrack),
    NotFound(String),
}

/// A strategy that did not produce a track, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: Strategy,
    pub reason: String,
}

/// Terminal state of an acquisition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaptionOutcome {
    Acquired(CaptionTrack),
    /// Every strategy came back empty. Not an error.
    Empty { attempts: Vec<StrategyAttempt> },
}

impl CaptionOutcome {
    pub fn track(&self) -> Option<&CaptionTrack> {
        match self {
            CaptionOutcome::Acquired(track) => Some(track),
            CaptionOutcome::Empty { .. } => None,
        }
    }

    pub fn into_track(self) -> Option<CaptionTrack> {
        match self {
            CaptionOutcome::Acquired(track) => Some(track),
            CaptionOutcome::Empty { .. } => None,
        }
    }

    /// Entries of the acquired track, or an empty slice.
    pub fn entries(&self) -> &[CaptionEntry] {
        self.track().map(|t| t.entries.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CaptionOutcome::Empty { .. })
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.track().map(|t| t.strategy)
    }

    /// The acquired track, or a caption error listing each strategy's reason.
    pub fn into_result(self, video_id: &str) -> crate::error::Result<CaptionTrack> {
        match self {
            CaptionOutcome::Acquired(track) => Ok(track),
            CaptionOutcome::Empty { attempts } => {
                let reasons: Vec<String> = attempts
                    .iter()
                    .map(|a| format!("{}: {}", a.strategy, a.reason))
                    .collect();
                Err(TubescribeError::Captions(format!(
                    "no captions for {} ({})",
                    video_id,
                    reasons.join("; ")
                )))
            }
        }
    }
}

/// Track listing shared by the enumeration strategies of one run.
type Listing = Result<Vec<TrackHandle>, ProviderError>;

/// Walks the strategy list against a caption provider.
///
/// The provider generation is probed on first use and reused for every
/// later call on this engine.
pub struct CaptionEngine {
    provider_name: String,
    modern: ModernAdapter,
    legacy: LegacyAdapter,
    generation: OnceLock<Generation>,
    languages: Vec<String>,
    prefer_manual: bool,
    timeout: Option<Duration>,
}

impl CaptionEngine {
    pub fn new(provider: Arc<dyn CaptionProvider>, settings: &CaptionSettings) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            modern: ModernAdapter::new(provider.clone()),
            legacy: LegacyAdapter::new(provider),
            generation: OnceLock::new(),
            languages: settings.languages.clone(),
            prefer_manual: settings.prefer_manual,
            timeout: settings.timeout(),
        }
    }

    /// Engine over the backend named in the settings.
    pub fn from_settings(settings: &CaptionSettings) -> Self {
        let provider: Arc<dyn CaptionProvider> = match settings.backend {
            CaptionBackendKind::Ytdlp => Arc::new(YtDlpCaptions::new(settings.timeout())),
            CaptionBackendKind::Timedtext => Arc::new(TimedTextCaptions::new(settings.timeout())),
        };
        Self::new(provider, settings)
    }

    /// Per-call timeout; an expired call counts as a transient failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generation detected so far, if any call has been made.
    pub fn detected_generation(&self) -> Option<Generation> {
        self.generation.get().copied()
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Acquire captions using the configured language preferences.
    pub async fn acquire(&self, video_id: &str) -> CaptionOutcome {
        self.acquire_with_languages(video_id, &self.languages).await
    }

    /// Acquire captions for an explicit language preference list.
    #[instrument(skip(self, languages), fields(provider = %self.provider_name))]
    pub async fn acquire_with_languages(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> CaptionOutcome {
        let mut attempts = Vec::new();
        let mut listing: Option<Listing> = None;

        for strategy in Strategy::ALL {
            match self.run(strategy, video_id, languages, &mut listing).await {
                StrategyOutcome::Success(track) => {
                    info!(
                        "Acquired {} caption entries for {} via {} ({})",
                        track.len(),
                        video_id,
                        strategy,
                        track.generation
                    );
                    return CaptionOutcome::Acquired(track);
                }
                StrategyOutcome::NotFound(reason) => {
                    debug!("Strategy {} found nothing: {}", strategy, reason);
                    attempts.push(StrategyAttempt { strategy, reason });
                }
            }
        }

        info!("No usable captions for {}", video_id);
        CaptionOutcome::Empty { attempts }
    }

    /// Run one strategy.
    pub async fn run_strategy(
        &self,
        strategy: Strategy,
        video_id: &str,
        languages: &[String],
    ) -> StrategyOutcome {
        self.run(strategy, video_id, languages, &mut None).await
    }

    async fn run(
        &self,
        strategy: Strategy,
        video_id: &str,
        languages: &[String],
        listing: &mut Option<Listing>,
    ) -> StrategyOutcome {
        match strategy {
            Strategy::AllLanguages => {
                if languages.is_empty() {
                    return StrategyOutcome::NotFound("no preferred languages".to_string());
                }
                let result = self.fetch(video_id, Some(languages)).await;
                self.finish(strategy, result)
            }

            Strategy::EachLanguage => {
                if languages.is_empty() {
                    return StrategyOutcome::NotFound("no preferred languages".to_string());
                }
                let mut reasons = Vec::new();
                for language in languages {
                    let single = std::slice::from_ref(language);
                    match self.finish(strategy, self.fetch(video_id, Some(single)).await) {
                        StrategyOutcome::Success(track) => return StrategyOutcome::Success(track),
                        StrategyOutcome::NotFound(reason) => {
                            reasons.push(format!("{}: {}", language, reason))
                        }
                    }
                }
                StrategyOutcome::NotFound(reasons.join("; "))
            }

            Strategy::ProviderDefault => {
                let result = self.fetch(video_id, None).await;
                self.finish(strategy, result)
            }

            Strategy::PreferredListed => {
                let handles = match self.listing(video_id, listing).await {
                    Ok(handles) => handles,
                    Err(reason) => return StrategyOutcome::NotFound(reason),
                };
                let candidates = self.preferred_candidates(&handles, languages);
                if candidates.is_empty() {
                    return StrategyOutcome::NotFound(format!(
                        "none of {} listed tracks match {:?}",
                        handles.len(),
                        languages
                    ));
                }

                let mut reasons = Vec::new();
                for handle in candidates {
                    let result = self.fetch_listed(video_id, &handle).await;
                    match self.finish(strategy, result) {
                        StrategyOutcome::Success(track) => return StrategyOutcome::Success(track),
                        StrategyOutcome::NotFound(reason) => {
                            reasons.push(format!("{}: {}", handle.language, reason))
                        }
                    }
                }
                StrategyOutcome::NotFound(reasons.join("; "))
            }

            Strategy::FirstListed => {
                let handles = match self.listing(video_id, listing).await {
                    Ok(handles) => handles,
                    Err(reason) => return StrategyOutcome::NotFound(reason),
                };
                match handles.first() {
                    Some(handle) => {
                        let result = self.fetch_listed(video_id, handle).await;
                        self.finish(strategy, result)
                    }
                    None => StrategyOutcome::NotFound("provider lists no tracks".to_string()),
                }
            }
        }
    }

    /// Listed tracks in preference order: preferred languages first, and
    /// within that, manual tracks before generated ones when configured.
    fn preferred_candidates(&self, handles: &[TrackHandle], languages: &[String]) -> Vec<TrackHandle> {
        let mut ordered = Vec::new();
        let origins: &[TrackOrigin] = &[TrackOrigin::Manual, TrackOrigin::Generated];

        if self.prefer_manual {
            for origin in origins {
                for language in languages {
                    ordered.extend(
                        handles
                            .iter()
                            .filter(|h| h.origin == *origin && h.matches_language(language))
                            .cloned(),
                    );
                }
            }
        } else {
            for language in languages {
                for origin in origins {
                    ordered.extend(
                        handles
                            .iter()
                            .filter(|h| h.origin == *origin && h.matches_language(language))
                            .cloned(),
                    );
                }
            }
        }

        let mut unique: Vec<TrackHandle> = Vec::with_capacity(ordered.len());
        for handle in ordered {
            if !unique.contains(&handle) {
                unique.push(handle);
            }
        }
        unique
    }

    fn finish(
        &self,
        strategy: Strategy,
        result: Result<(Generation, ProviderTrack), ProviderError>,
    ) -> StrategyOutcome {
        match result {
            Ok((generation, track)) => {
                let entries = normalize_entries(track.entries);
                if entries.is_empty() {
                    return StrategyOutcome::NotFound("track has no usable entries".to_string());
                }
                StrategyOutcome::Success(CaptionTrack {
                    entries,
                    strategy,
                    language: track.language,
                    origin: track.origin,
                    generation,
                })
            }
            Err(e) => StrategyOutcome::NotFound(e.to_string()),
        }
    }

    fn adapter(&self, generation: Generation) -> &dyn CaptionProviderAdapter {
        match generation {
            Generation::Modern => &self.modern,
            Generation::Legacy => &self.legacy,
        }
    }

    /// Fetch through the detected adapter, probing on first use.
    async fn fetch(
        &self,
        video_id: &str,
        languages: Option<&[String]>,
    ) -> Result<(Generation, ProviderTrack), ProviderError> {
        if let Some(generation) = self.detected_generation() {
            let track = self
                .timed(self.adapter(generation).fetch(video_id, languages))
                .await?;
            return Ok((generation, track));
        }

        match self.timed(self.modern.fetch(video_id, languages)).await {
            Err(e) if e.is_interface_absence() => {
                let generation = self.detect(Generation::Legacy, &e.to_string());
                let track = self
                    .timed(self.adapter(generation).fetch(video_id, languages))
                    .await?;
                Ok((generation, track))
            }
            other => {
                let generation = self.detect(Generation::Modern, "");
                other.map(|track| (generation, track))
            }
        }
    }

    async fn fetch_listed(
        &self,
        video_id: &str,
        handle: &TrackHandle,
    ) -> Result<(Generation, ProviderTrack), ProviderError> {
        let generation = self.detected_generation().unwrap_or(Generation::Modern);
        let track = self
            .timed(self.adapter(generation).fetch_listed(video_id, handle))
            .await?;
        Ok((generation, track))
    }

    /// Track listing for this run, fetched at most once.
    async fn listing(
        &self,
        video_id: &str,
        cache: &mut Option<Listing>,
    ) -> Result<Vec<TrackHandle>, String> {
        if cache.is_none() {
            let listing = match self.detected_generation() {
                Some(generation) => self.timed(self.adapter(generation).list(video_id)).await,
                None => match self.timed(self.modern.list(video_id)).await {
                    Err(e) if e.is_interface_absence() => {
                        let generation = self.detect(Generation::Legacy, &e.to_string());
                        self.timed(self.adapter(generation).list(video_id)).await
                    }
                    other => {
                        self.detect(Generation::Modern, "");
                        other
                    }
                },
            };
            *cache = Some(listing);
        }

        match cache {
            Some(Ok(handles)) => Ok(handles.clone()),
            Some(Err(e)) => Err(e.to_string()),
            None => Err("listing unavailable".to_string()),
        }
    }

    /// Record the detected generation; the first detection wins.
    fn detect(&self, generation: Generation, reason: &str) -> Generation {
        *self.generation.get_or_init(|| {
            match generation {
                Generation::Legacy => debug!(
                    "{}: {}; using legacy caption interface",
                    self.provider_name, reason
                ),
                Generation::Modern => {
                    debug!("{} exposes the modern caption interface", self.provider_name)
                }
            }
            generation
        })
    }

    async fn timed<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(limit.as_secs_f64())),
            },
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{LegacyOnly, ModernMock, SlowProvider};
    use super::super::RawEntry;
    use super::*;

    fn settings(languages: &[&str]) -> CaptionSettings {
        CaptionSettings {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            ..CaptionSettings::default()
        }
    }

    fn entries(texts: &[&str]) -> Vec<RawEntry> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RawEntry::new(i as f64 * 2.0, 2.0, *t))
            .collect()
    }

    #[tokio::test]
    async fn test_modern_first_strategy() {
        let provider = ModernMock::default().manual("en", entries(&["hello", "world"]));
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["ko", "en"]));

        let outcome = engine.acquire("vid").await;
        let track = outcome.track().expect("track");
        assert_eq!(track.strategy, Strategy::AllLanguages);
        assert_eq!(track.language.as_deref(), Some("en"));
        assert_eq!(track.generation, Generation::Modern);
        assert_eq!(track.text(), "hello world");
        assert_eq!(engine.detected_generation(), Some(Generation::Modern));
    }

    #[tokio::test]
    async fn test_legacy_only_succeeds_on_each_language() {
        let provider = Arc::new(LegacyOnly::rejecting_multi_language().with_track("en", entries(&["hi"])));
        let engine = CaptionEngine::new(provider.clone(), &settings(&["ko", "en"]));

        let outcome = engine.acquire("vid").await;
        let track = outcome.track().expect("track");
        assert_eq!(track.strategy, Strategy::EachLanguage);
        assert_eq!(track.generation, Generation::Legacy);
        assert_eq!(track.language.as_deref(), Some("en"));
        assert_eq!(engine.detected_generation(), Some(Generation::Legacy));
    }

    #[tokio::test]
    async fn test_generation_probed_once() {
        let provider = Arc::new(LegacyOnly::rejecting_multi_language());
        let engine = CaptionEngine::new(provider.clone(), &settings(&["ko", "en"]));

        let first = engine.acquire("vid").await;
        let second = engine.acquire("vid").await;
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(provider.modern_probes(), 1);
    }

    #[tokio::test]
    async fn test_provider_default_strategy() {
        let provider = ModernMock::default().default_track(entries(&["default"]));
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["ko"]));

        let outcome = engine.acquire("vid").await;
        assert_eq!(outcome.strategy(), Some(Strategy::ProviderDefault));
    }

    #[tokio::test]
    async fn test_listed_prefers_manual() {
        let provider = ModernMock::default()
            .listed_only()
            .generated("en", entries(&["auto"]))
            .manual("en", entries(&["manual"]));
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["en"]));

        let outcome = engine.acquire("vid").await;
        let track = outcome.track().expect("track");
        assert_eq!(track.strategy, Strategy::PreferredListed);
        assert_eq!(track.origin, Some(TrackOrigin::Manual));
        assert_eq!(track.text(), "manual");
    }

    #[tokio::test]
    async fn test_listed_falls_back_to_first() {
        let provider = ModernMock::default()
            .listed_only()
            .generated("fr", entries(&["bonjour"]));
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["ko", "en"]));

        let outcome = engine.acquire("vid").await;
        let track = outcome.track().expect("track");
        assert_eq!(track.strategy, Strategy::FirstListed);
        assert_eq!(track.language.as_deref(), Some("fr"));
    }

    #[tokio::test]
    async fn test_exhaustion_is_empty_outcome() {
        let engine = CaptionEngine::new(Arc::new(ModernMock::default()), &settings(&["ko", "en"]));

        let outcome = engine.acquire("vid").await;
        match &outcome {
            CaptionOutcome::Empty { attempts } => {
                let strategies: Vec<Strategy> = attempts.iter().map(|a| a.strategy).collect();
                assert_eq!(strategies, Strategy::ALL.to_vec());
            }
            other => panic!("expected empty outcome, got {:?}", other),
        }
        assert!(outcome.entries().is_empty());

        match outcome.into_result("vid") {
            Err(TubescribeError::Captions(msg)) => {
                assert!(msg.contains("vid"));
                assert!(msg.contains(Strategy::ALL[0].as_str()));
            }
            other => panic!("expected caption error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_acquisition_is_idempotent() {
        let provider = Arc::new(LegacyOnly::rejecting_multi_language().with_track("en", entries(&["a", "b"])));
        let engine = CaptionEngine::new(provider, &settings(&["ko", "en"]));

        let first = engine.acquire("vid").await;
        let second = engine.acquire("vid").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_starts_non_decreasing() {
        let raw = vec![
            RawEntry::new(4.0, 1.0, "c"),
            RawEntry::new(0.0, 1.0, "a"),
            RawEntry::new(2.0, 1.0, "b"),
        ];
        let provider = ModernMock::default().manual("ko", raw);
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["ko"]));

        let outcome = engine.acquire("vid").await;
        let starts: Vec<f64> = outcome.entries().iter().map(|e| e.start).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(outcome.track().map(|t| t.text()), Some("a b c".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_advances_strategies() {
        let engine = CaptionEngine::new(Arc::new(SlowProvider), &settings(&["en"]))
            .with_timeout(Some(Duration::from_millis(10)));

        let outcome = engine.acquire("vid").await;
        match outcome {
            CaptionOutcome::Empty { attempts } => {
                assert_eq!(attempts.len(), 5);
                assert!(attempts[0].reason.contains("timed out"));
            }
            other => panic!("expected empty outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_track_is_not_success() {
        let provider = ModernMock::default().manual("en", entries(&["  ", ""]));
        let engine = CaptionEngine::new(Arc::new(provider), &settings(&["en"]));

        let outcome = engine.run_strategy(Strategy::AllLanguages, "vid", &["en".to_string()]).await;
        assert!(matches!(outcome, StrategyOutcome::NotFound(_)));
    }
}
