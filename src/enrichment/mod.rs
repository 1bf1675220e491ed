//! Generative enrichment of caption text: summaries, translations, topics.
//!
//! Every call is bounded: input is truncated to a character budget, and
//! each logical operation makes at most `retry_count` provider calls with
//! linear backoff between them. Failures never escape as errors; they are
//! logged and surface as an absent result.

mod language;
mod provider;
mod topics;
mod truncate;

pub use language::language_name;
pub use provider::OpenAiCompatibleProvider;
pub use topics::parse_topics;
pub use truncate::truncate_text;

use crate::captions::{combine_text, CaptionEntry};
use crate::config::{positive_duration, EnrichmentSettings, Prompts};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Text generation backend.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Option<Duration>,
    ) -> Result<String>;
}

/// Which enrichment features to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceOptions {
    pub summary: bool,
    pub topics: bool,
    /// Translate into this language when set.
    pub translate_to: Option<String>,
    /// Language for summary and topics (settings default when unset).
    pub language: Option<String>,
    pub max_points: Option<usize>,
    pub num_topics: Option<usize>,
    /// Per-call timeout in seconds; settings default when unset.
    pub timeout_seconds: Option<f64>,
}

impl EnhanceOptions {
    /// Feature toggles as configured. Translation needs a target language.
    pub fn from_settings(settings: &EnrichmentSettings) -> Self {
        Self {
            summary: settings.summary,
            topics: settings.topics,
            translate_to: settings
                .target_language
                .clone()
                .filter(|_| settings.translation),
            language: None,
            max_points: None,
            num_topics: None,
            timeout_seconds: None,
        }
    }

    /// Whether any feature is requested.
    pub fn is_requested(&self) -> bool {
        self.summary || self.topics || self.translate_to.is_some()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.and_then(positive_duration)
    }
}

/// Output of [`EnrichmentClient::enhance`]. Each field is absent when the
/// feature was not requested or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub summary: Option<String>,
    pub translation: Option<String>,
    pub topics: Option<Vec<String>>,
    pub elapsed_seconds: f64,
}

/// Delay before the attempt following attempt `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt
}

/// Retrying, truncating client for a [`GenerativeProvider`].
pub struct EnrichmentClient {
    provider: Option<Arc<dyn GenerativeProvider>>,
    settings: EnrichmentSettings,
    prompts: Prompts,
}

impl EnrichmentClient {
    /// Client over the configured OpenAI-compatible endpoint. Without a
    /// resolvable API key the client is built but reports unavailable.
    pub fn new(settings: EnrichmentSettings, prompts: Prompts) -> Self {
        let provider: Option<Arc<dyn GenerativeProvider>> =
            match OpenAiCompatibleProvider::from_settings(&settings) {
                Ok(Some(provider)) => {
                    info!("Enrichment enabled with model {}", settings.model);
                    Some(Arc::new(provider))
                }
                Ok(None) => {
                    warn!("No generative API key configured; enrichment disabled");
                    None
                }
                Err(e) => {
                    warn!("Failed to initialize generative provider: {}", e);
                    None
                }
            };

        Self {
            provider,
            settings,
            prompts,
        }
    }

    /// Client over an explicit provider.
    pub fn with_provider(
        provider: Arc<dyn GenerativeProvider>,
        settings: EnrichmentSettings,
        prompts: Prompts,
    ) -> Self {
        Self {
            provider: Some(provider),
            settings,
            prompts,
        }
    }

    /// Client that reports unavailable and never calls out.
    pub fn disabled(settings: EnrichmentSettings, prompts: Prompts) -> Self {
        Self {
            provider: None,
            settings,
            prompts,
        }
    }

    /// Whether calls can be made at all. Callers check this before use.
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Summarize `text` into `max_points` points in `language`. Each attempt
    /// is bounded by `timeout`, or the configured request timeout.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn summarize(
        &self,
        text: &str,
        max_points: usize,
        language: &str,
        timeout: Option<Duration>,
    ) -> Option<String> {
        if text.trim().is_empty() {
            debug!("Nothing to summarize");
            return None;
        }

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), self.truncate(text).to_string());
        vars.insert("max_points".to_string(), max_points.to_string());
        vars.insert("language_name".to_string(), language_name(language).to_string());
        let prompt = self
            .prompts
            .render_with_custom(self.prompts.summary.for_language(language), &vars);

        self.call(
            "summary",
            &prompt,
            self.settings.temperature.summary,
            timeout.or_else(|| self.settings.request_timeout()),
        )
        .await
    }

    /// Translate `text` into `target`, from `source` when known. Falls back
    /// to the translation timeout when `timeout` is unset.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
        timeout: Option<Duration>,
    ) -> Option<String> {
        if text.trim().is_empty() {
            debug!("Nothing to translate");
            return None;
        }

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), self.truncate(text).to_string());
        vars.insert("target_language".to_string(), language_name(target).to_string());
        let template = match source {
            Some(source) => {
                vars.insert("source_language".to_string(), language_name(source).to_string());
                &self.prompts.translate.with_source
            }
            None => &self.prompts.translate.auto_detect,
        };
        let prompt = self.prompts.render_with_custom(template, &vars);

        self.call(
            "translation",
            &prompt,
            self.settings.temperature.translate,
            timeout.or_else(|| self.settings.translate_timeout()),
        )
        .await
    }

    /// Extract up to `count` topics from `text`.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn extract_topics(
        &self,
        text: &str,
        count: usize,
        language: &str,
        timeout: Option<Duration>,
    ) -> Option<Vec<String>> {
        if text.trim().is_empty() {
            debug!("Nothing to extract topics from");
            return None;
        }

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), self.truncate(text).to_string());
        vars.insert("num_topics".to_string(), count.to_string());
        vars.insert("language_name".to_string(), language_name(language).to_string());
        let prompt = self
            .prompts
            .render_with_custom(self.prompts.topics.for_language(language), &vars);

        let raw = self
            .call(
                "topics",
                &prompt,
                self.settings.temperature.topics,
                timeout.or_else(|| self.settings.request_timeout()),
            )
            .await?;
        Some(parse_topics(&raw, count))
    }

    pub async fn summarize_track(
        &self,
        entries: &[CaptionEntry],
        max_points: usize,
        language: &str,
        timeout: Option<Duration>,
    ) -> Option<String> {
        self.summarize(&combine_text(entries), max_points, language, timeout)
            .await
    }

    pub async fn translate_track(
        &self,
        entries: &[CaptionEntry],
        target: &str,
        source: Option<&str>,
        timeout: Option<Duration>,
    ) -> Option<String> {
        self.translate(&combine_text(entries), target, source, timeout)
            .await
    }

    pub async fn extract_topics_track(
        &self,
        entries: &[CaptionEntry],
        count: usize,
        language: &str,
        timeout: Option<Duration>,
    ) -> Option<Vec<String>> {
        self.extract_topics(&combine_text(entries), count, language, timeout)
            .await
    }

    /// Run the requested subset of features on `text`.
    pub async fn enhance(&self, text: &str, options: &EnhanceOptions) -> EnrichmentResult {
        let mut result = EnrichmentResult::default();
        if !self.is_available() {
            warn!("Enrichment unavailable; skipping");
            return result;
        }

        let started = Instant::now();
        let language = options
            .language
            .as_deref()
            .unwrap_or(&self.settings.language);
        let timeout = options.timeout();

        if options.summary {
            let points = options.max_points.unwrap_or(self.settings.max_summary_points);
            result.summary = self.summarize(text, points, language, timeout).await;
        }

        if let Some(target) = options.translate_to.as_deref() {
            result.translation = self.translate(text, target, None, timeout).await;
        }

        if options.topics {
            let count = options.num_topics.unwrap_or(self.settings.num_topics);
            result.topics = self.extract_topics(text, count, language, timeout).await;
        }

        result.elapsed_seconds = started.elapsed().as_secs_f64();
        info!("Enrichment completed in {:.2}s", result.elapsed_seconds);
        result
    }

    pub async fn enhance_track(
        &self,
        entries: &[CaptionEntry],
        options: &EnhanceOptions,
    ) -> EnrichmentResult {
        self.enhance(&combine_text(entries), options).await
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        let truncated = truncate_text(text, self.settings.max_input_chars);
        if truncated.len() < text.len() {
            debug!(
                "Truncated input from {} to {} bytes",
                text.len(),
                truncated.len()
            );
        }
        truncated
    }

    /// One logical call: up to `retry_count` attempts, linear backoff.
    async fn call(
        &self,
        feature: &str,
        prompt: &str,
        temperature: f32,
        timeout: Option<Duration>,
    ) -> Option<String> {
        let Some(provider) = &self.provider else {
            warn!("Enrichment unavailable for {}", feature);
            return None;
        };

        let attempts = self.settings.retry_count;
        let base = self.settings.retry_delay();

        for attempt in 1..=attempts {
            let outcome = match timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, provider.generate(prompt, temperature, timeout))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(crate::error::TubescribeError::Enrichment(format!(
                            "timed out after {:.1}s",
                            limit.as_secs_f64()
                        ))),
                    }
                }
                None => provider.generate(prompt, temperature, None).await,
            };

            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("{} succeeded on attempt {}", feature, attempt);
                    return Some(text.trim().to_string());
                }
                Ok(_) => warn!(
                    "Empty {} response (attempt {}/{})",
                    feature, attempt, attempts
                ),
                Err(e) => warn!(
                    "{} attempt {}/{} failed: {}",
                    feature, attempt, attempts, e
                ),
            }

            if attempt < attempts {
                tokio::time::sleep(backoff_delay(base, attempt)).await;
            }
        }

        error!("{} failed after {} attempts", feature, attempts);
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::TubescribeError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider replaying scripted responses; fails once the script runs out.
    #[derive(Default)]
    pub struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn replying(responses: &[&str]) -> Self {
            let provider = Self::default();
            {
                let mut queue = provider.responses.lock().unwrap();
                queue.extend(responses.iter().map(|r| Ok(r.to_string())));
            }
            provider
        }

        pub fn failing() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            prompt: &str,
            _temperature: f32,
            _timeout: Option<Duration>,
        ) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TubescribeError::OpenAI("scripted failure".to_string())))
        }
    }

    /// Provider that never answers.
    #[derive(Default)]
    pub struct HangingProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl HangingProvider {
        pub fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _temperature: f32,
            _timeout: Option<Duration>,
        ) -> Result<String> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    /// Settings with no backoff delay.
    pub fn fast_settings() -> EnrichmentSettings {
        EnrichmentSettings {
            retry_delay_seconds: 0.0,
            ..EnrichmentSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{fast_settings, HangingProvider, ScriptedProvider};
    use super::*;

    fn client(provider: Arc<ScriptedProvider>) -> EnrichmentClient {
        EnrichmentClient::with_provider(provider, fast_settings(), Prompts::default())
    }

    #[tokio::test]
    async fn test_empty_text_skips_provider() {
        let provider = Arc::new(ScriptedProvider::replying(&["unused"]));
        let client = client(provider.clone());

        assert_eq!(client.summarize("", 5, "en", None).await, None);
        assert_eq!(client.summarize("   \n", 5, "en", None).await, None);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_bound_on_failures() {
        let provider = Arc::new(ScriptedProvider::failing());
        let client = client(provider.clone());

        assert_eq!(client.summarize("some text", 5, "en", None).await, None);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_times_out_each_attempt() {
        let provider = Arc::new(HangingProvider::default());
        let client =
            EnrichmentClient::with_provider(provider.clone(), fast_settings(), Prompts::default());

        let summary = client
            .summarize("text", 3, "en", Some(Duration::from_secs(5)))
            .await;
        assert_eq!(summary, None);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_topics_use_configured_timeout() {
        let provider = Arc::new(HangingProvider::default());
        let settings = EnrichmentSettings {
            timeout_seconds: Some(2.0),
            ..fast_settings()
        };
        let client = EnrichmentClient::with_provider(provider.clone(), settings, Prompts::default());

        let options = EnhanceOptions {
            topics: true,
            ..EnhanceOptions::default()
        };
        let result = client.enhance("text", &options).await;
        assert_eq!(result.topics, None);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_payload_is_retried() {
        let provider = Arc::new(ScriptedProvider::replying(&["", "   ", " 1. point \n"]));
        let client = client(provider.clone());

        let summary = client.summarize("some text", 5, "en", None).await;
        assert_eq!(summary.as_deref(), Some("1. point"));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_custom_retry_count() {
        let provider = Arc::new(ScriptedProvider::failing());
        let settings = EnrichmentSettings {
            retry_count: 5,
            ..fast_settings()
        };
        let client = EnrichmentClient::with_provider(provider.clone(), settings, Prompts::default());

        assert!(client.translate("hello", "ko", None, None).await.is_none());
        assert_eq!(provider.calls(), 5);
    }

    #[test]
    fn test_linear_backoff() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_summary_prompt_language() {
        let provider = Arc::new(ScriptedProvider::replying(&["요약", "summary"]));
        let client = client(provider.clone());

        client.summarize("스크립트", 3, "ko", None).await;
        client.summarize("script", 4, "ja", None).await;

        let prompts = provider.prompts();
        assert!(prompts[0].contains("3개의 핵심 포인트"));
        assert!(prompts[0].contains("스크립트"));
        assert!(prompts[1].contains("4 key points in Japanese"));
        assert!(prompts[1].contains("Output only the summary"));
    }

    #[tokio::test]
    async fn test_translate_prompt() {
        let provider = Arc::new(ScriptedProvider::replying(&["안녕", "안녕"]));
        let client = client(provider.clone());

        assert_eq!(
            client.translate("hello", "ko", Some("en"), None).await.as_deref(),
            Some("안녕")
        );
        client.translate("hello", "ko", None, None).await;

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Translate the following English text to Korean."));
        assert!(prompts[1].contains("Translate the following text to Korean."));
        assert!(prompts[1].contains("Output only the translation"));
    }

    #[tokio::test]
    async fn test_extract_topics_parses_and_limits() {
        let provider = Arc::new(ScriptedProvider::replying(&["- A\n* B\n3. C\n- D"]));
        let client = client(provider);

        let topics = client.extract_topics("text", 3, "en", None).await;
        assert_eq!(topics, Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]));
    }

    #[tokio::test]
    async fn test_input_truncated_to_budget() {
        let provider = Arc::new(ScriptedProvider::replying(&["ok"]));
        let settings = EnrichmentSettings {
            max_input_chars: 100,
            ..fast_settings()
        };
        let client = EnrichmentClient::with_provider(provider.clone(), settings, Prompts::default());

        let text = format!("{}TAIL", "word ".repeat(100));
        client.summarize(&text, 5, "en", None).await;
        assert!(!provider.prompts()[0].contains("TAIL"));
    }

    #[tokio::test]
    async fn test_enhance_runs_requested_features() {
        let provider = Arc::new(ScriptedProvider::replying(&["the summary", "- t1\n- t2"]));
        let client = client(provider.clone());

        let options = EnhanceOptions {
            summary: true,
            topics: true,
            ..EnhanceOptions::default()
        };
        let result = client.enhance("caption text", &options).await;
        assert_eq!(result.summary.as_deref(), Some("the summary"));
        assert_eq!(result.topics, Some(vec!["t1".to_string(), "t2".to_string()]));
        assert_eq!(result.translation, None);
        assert!(result.elapsed_seconds >= 0.0);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_client() {
        let client = EnrichmentClient::disabled(fast_settings(), Prompts::default());
        assert!(!client.is_available());
        assert_eq!(client.summarize("text", 5, "en", None).await, None);

        let options = EnhanceOptions {
            summary: true,
            ..EnhanceOptions::default()
        };
        assert_eq!(client.enhance("text", &options).await, EnrichmentResult::default());
    }

    #[test]
    fn test_options_from_settings() {
        let settings = EnrichmentSettings {
            summary: true,
            translation: true,
            target_language: None,
            ..EnrichmentSettings::default()
        };
        let options = EnhanceOptions::from_settings(&settings);
        assert!(options.summary);
        assert!(options.translate_to.is_none());

        let settings = EnrichmentSettings {
            translation: true,
            target_language: Some("en".to_string()),
            ..EnrichmentSettings::default()
        };
        assert_eq!(
            EnhanceOptions::from_settings(&settings).translate_to.as_deref(),
            Some("en")
        );
    }
}
