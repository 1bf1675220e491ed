//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{EnrichmentSettings, Settings, API_KEY_ENV_VARS};
use crate::error::{Result, TubescribeError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Metadata and captions need yt-dlp.
    Fetch,
    /// Enrichment needs an API key.
    Enhance,
    /// Classification is purely local.
    Classify,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Fetch => {
            check_tool("yt-dlp")?;
        }
        Operation::Enhance => {
            check_api_key(&settings.enrichment)?;
        }
        Operation::Classify => {
            // No external requirements for classification
        }
    }
    Ok(())
}

/// Check that a generative API key resolves from config or environment.
fn check_api_key(settings: &EnrichmentSettings) -> Result<()> {
    match settings.resolve_api_key() {
        Some(_) => Ok(()),
        None => Err(TubescribeError::Config(format!(
            "No API key found. Set one of {} or enrichment.api_key in the config file",
            API_KEY_ENV_VARS.join(", ")
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TubescribeError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TubescribeError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TubescribeError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_classify_no_requirements() {
        assert!(check(Operation::Classify, &Settings::default()).is_ok());
    }

    #[test]
    fn test_configured_key_passes_enhance() {
        let settings = Settings::default().with_api_key("configured-key");
        assert!(check(Operation::Enhance, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let result = check_tool("tubescribe-no-such-tool");
        assert!(matches!(result, Err(TubescribeError::ToolNotFound(_))));
    }
}
