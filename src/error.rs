//! Error types for Tubescribe.

use thiserror::Error;

/// Library-level error type for Tubescribe operations.
#[derive(Error, Debug)]
pub enum TubescribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Metadata source error: {0}")]
    MetadataSource(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Caption error: {0}")]
    Captions(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Generative provider unavailable: {0}")]
    Unavailable(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}

/// Result type alias for Tubescribe operations.
pub type Result<T> = std::result::Result<T, TubescribeError>;

/// Failure reported by a caption provider.
///
/// The caption engine treats these differently: `Unsupported` means the
/// provider does not expose the requested operation at all and selects a
/// different interface generation, while every other variant only moves
/// the engine on to its next strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("operation not supported by provider: {0}")]
    Unsupported(&'static str),

    #[error("no captions found: {0}")]
    NotFound(String),

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider call timed out after {0:.1}s")]
    Timeout(f64),
}

impl ProviderError {
    /// Whether the failure means the interface itself is missing.
    pub fn is_interface_absence(&self) -> bool {
        matches!(self, ProviderError::Unsupported(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Transient(format!("request timed out: {}", e))
        } else if e.status().is_some_and(|s| s == reqwest::StatusCode::NOT_FOUND) {
            ProviderError::NotFound(e.to_string())
        } else {
            ProviderError::Transient(e.to_string())
        }
    }
}
