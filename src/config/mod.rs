//! Configuration module for Tubescribe.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{LocalizedPrompt, Prompts, TranslatePrompts};
pub use settings::{
    CaptionBackendKind, CaptionSettings, CollectionSettings, EnrichmentSettings, GeneralSettings,
    positive_duration, PromptSettings, ServerSettings, Settings, TemperatureSettings,
    API_KEY_ENV_VARS,
};
