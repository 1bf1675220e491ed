//! Thin async wrapper around the `yt-dlp` executable.

use crate::error::{Result, TubescribeError};
use std::time::Duration;
use tracing::debug;

/// Invokes `yt-dlp` and parses its JSON output.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    timeout: Option<Duration>,
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout: None,
        }
    }

    /// Use a different executable path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `yt-dlp --dump-single-json` with extra arguments and parse stdout.
    pub async fn dump_json(&self, url: &str, extra_args: &[&str]) -> Result<serde_json::Value> {
        let mut args = vec![
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--quiet",
        ];
        args.extend_from_slice(extra_args);
        args.push(url);

        debug!("Running {} {}", self.binary, args.join(" "));

        let mut command = tokio::process::Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    TubescribeError::ToolFailed(format!(
                        "{} timed out after {:.1}s",
                        self.binary,
                        limit.as_secs_f64()
                    ))
                })?,
            None => command.output().await,
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TubescribeError::ToolNotFound(self.binary.clone())
            } else {
                TubescribeError::ToolFailed(format!("Failed to run {}: {}", self.binary, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubescribeError::VideoNotFound(format!(
                "{} is not available: {}",
                url,
                stderr.trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            TubescribeError::MetadataSource(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        Ok(json)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}
