//! Configuration settings for Tubescribe.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables consulted for the generative provider key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "OPENAI_API_KEY"];

/// Upper bound for the backoff base delay, in seconds.
const MAX_RETRY_DELAY_SECS: f64 = 60.0;

/// Positive, representable seconds as a `Duration`. Zero, negative, NaN,
/// infinite and out-of-range values give `None`.
pub fn positive_duration(seconds: f64) -> Option<Duration> {
    if !(seconds > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub captions: CaptionSettings,
    pub enrichment: EnrichmentSettings,
    pub collection: CollectionSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where rendered results are written.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "./output".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Caption backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptionBackendKind {
    /// yt-dlp track listing with json3 downloads.
    #[default]
    Ytdlp,
    /// Direct timed-text endpoint (no track enumeration).
    Timedtext,
}

impl std::str::FromStr for CaptionBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ytdlp" | "yt-dlp" => Ok(CaptionBackendKind::Ytdlp),
            "timedtext" | "timed-text" => Ok(CaptionBackendKind::Timedtext),
            _ => Err(format!("Unknown caption backend: {}", s)),
        }
    }
}

impl std::fmt::Display for CaptionBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionBackendKind::Ytdlp => write!(f, "ytdlp"),
            CaptionBackendKind::Timedtext => write!(f, "timedtext"),
        }
    }
}

/// Caption acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Ordered language preference list.
    pub languages: Vec<String>,
    /// Prefer manually authored tracks over automatic ones when enumerating.
    pub prefer_manual: bool,
    /// Which caption backend to use.
    pub backend: CaptionBackendKind,
    /// Optional per-call timeout in seconds.
    pub timeout_seconds: Option<f64>,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            languages: vec!["ko".to_string(), "en".to_string()],
            prefer_manual: true,
            backend: CaptionBackendKind::Ytdlp,
            timeout_seconds: None,
        }
    }
}

impl CaptionSettings {
    /// Per-call timeout; unusable values mean no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.and_then(positive_duration)
    }
}

/// Sampling temperatures for each enrichment feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    pub summary: f32,
    pub translate: f32,
    pub topics: f32,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            summary: 0.3,
            translate: 0.3,
            topics: 0.5,
        }
    }
}

/// Generative enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    /// Model identifier sent to the provider.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key. Falls back to environment variables when unset.
    pub api_key: Option<String>,
    /// Maximum provider invocations per logical call.
    pub retry_count: u32,
    /// Base delay for linear backoff, in seconds.
    pub retry_delay_seconds: f64,
    /// Character budget for text sent to the provider.
    pub max_input_chars: usize,
    /// Number of summary points to request.
    pub max_summary_points: usize,
    /// Number of topics to extract.
    pub num_topics: usize,
    /// Language for summaries and topics.
    pub language: String,
    /// Generate a summary by default.
    pub summary: bool,
    /// Extract topics by default.
    pub topics: bool,
    /// Translate by default (requires `target_language`).
    pub translation: bool,
    /// Default translation target.
    pub target_language: Option<String>,
    /// Timeout for each summary and topic call, in seconds.
    pub timeout_seconds: Option<f64>,
    /// Timeout for each translation call, in seconds.
    pub translate_timeout_seconds: Option<f64>,
    pub temperature: TemperatureSettings,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            retry_count: 3,
            retry_delay_seconds: 1.0,
            max_input_chars: 30_000,
            max_summary_points: 5,
            num_topics: 5,
            language: "ko".to_string(),
            summary: false,
            topics: false,
            translation: false,
            target_language: None,
            timeout_seconds: Some(60.0),
            translate_timeout_seconds: Some(30.0),
            temperature: TemperatureSettings::default(),
        }
    }
}

impl EnrichmentSettings {
    /// Resolve the API key from settings or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
    }

    /// Backoff base, capped at one minute.
    pub fn retry_delay(&self) -> Duration {
        positive_duration(self.retry_delay_seconds.min(MAX_RETRY_DELAY_SECS))
            .unwrap_or(Duration::ZERO)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.and_then(positive_duration)
    }

    pub fn translate_timeout(&self) -> Option<Duration> {
        self.translate_timeout_seconds.and_then(positive_duration)
    }
}

/// Collection (playlist) processing settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CollectionSettings {
    /// Maximum number of items processed per collection (all when unset).
    pub max_items: Option<usize>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TubescribeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubescribe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Override the caption language preference list.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.captions.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Override the enrichment API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.enrichment.api_key = Some(key.into());
        self
    }

    /// Override retry parameters for the enrichment client.
    pub fn with_retry(mut self, retry_count: u32, retry_delay_seconds: f64) -> Self {
        self.enrichment.retry_count = retry_count;
        self.enrichment.retry_delay_seconds = retry_delay_seconds;
        self
    }

    /// Cap the number of items processed per collection.
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.collection.max_items = max_items;
        self
    }

    /// Set a single value by dotted key (e.g. `captions.languages`).
    ///
    /// Values are parsed as TOML first and fall back to a plain string.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        let mut root = toml::Value::try_from(&*self)
            .map_err(|e| crate::error::TubescribeError::Config(e.to_string()))?;

        let parsed = format!("v = {}", value)
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));

        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| crate::error::TubescribeError::Config("empty key".to_string()))?;

        let mut cursor = &mut root;
        for part in parents {
            cursor = cursor
                .get_mut(*part)
                .ok_or_else(|| crate::error::TubescribeError::Config(format!("Unknown key: {}", key)))?;
        }

        let table = cursor
            .as_table_mut()
            .ok_or_else(|| crate::error::TubescribeError::Config(format!("Not a section: {}", key)))?;
        table.insert(last.to_string(), parsed);

        *self = root
            .try_into()
            .map_err(|e: toml::de::Error| crate::error::TubescribeError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.captions.languages, vec!["ko", "en"]);
        assert!(settings.captions.prefer_manual);
        assert_eq!(settings.enrichment.retry_count, 3);
        assert_eq!(settings.enrichment.max_input_chars, 30_000);
        assert_eq!(settings.enrichment.num_topics, 5);
        assert!(settings.collection.max_items.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [captions]
            languages = ["en"]

            [enrichment]
            retry_count = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.captions.languages, vec!["en"]);
        assert_eq!(settings.captions.backend, CaptionBackendKind::Ytdlp);
        assert_eq!(settings.enrichment.retry_count, 5);
        assert_eq!(settings.enrichment.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let settings = Settings::default()
            .with_languages(["ja"])
            .with_max_items(Some(3));
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.captions.languages, vec!["ja"]);
        assert_eq!(loaded.collection.max_items, Some(3));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = PathBuf::from("/nonexistent/tubescribe/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        assert_ok!(settings.set_value("enrichment.retry_count", "7"));
        assert_ok!(settings.set_value("captions.languages", r#"["fr", "en"]"#));
        assert_ok!(settings.set_value("enrichment.model", "gpt-4o-mini"));

        assert_eq!(settings.enrichment.retry_count, 7);
        assert_eq!(settings.captions.languages, vec!["fr", "en"]);
        assert_eq!(settings.enrichment.model, "gpt-4o-mini");

        assert_err!(settings.set_value("nope.key", "1"));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let settings = Settings::default().with_api_key("key-123");
        assert_eq!(settings.enrichment.resolve_api_key().as_deref(), Some("key-123"));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("yt-dlp".parse::<CaptionBackendKind>().unwrap(), CaptionBackendKind::Ytdlp);
        assert_eq!("timedtext".parse::<CaptionBackendKind>().unwrap(), CaptionBackendKind::Timedtext);
        assert_err!("other".parse::<CaptionBackendKind>());
    }

    #[test]
    fn test_unusable_durations_do_not_panic() {
        let settings: Settings = assert_ok!(toml::from_str(
            r#"
            [captions]
            timeout_seconds = inf

            [enrichment]
            retry_delay_seconds = inf
            timeout_seconds = 1e300
            translate_timeout_seconds = nan
            "#,
        ));

        assert_eq!(settings.captions.timeout(), None);
        assert_eq!(settings.enrichment.retry_delay(), Duration::from_secs(60));
        assert_eq!(settings.enrichment.request_timeout(), None);
        assert_eq!(settings.enrichment.translate_timeout(), None);
    }

    #[test]
    fn test_positive_duration() {
        assert_eq!(positive_duration(1.5), Some(Duration::from_millis(1500)));
        assert_eq!(positive_duration(0.0), None);
        assert_eq!(positive_duration(-2.0), None);
        assert_eq!(positive_duration(f64::INFINITY), None);
        assert_eq!(positive_duration(f64::NAN), None);
    }
}
