//! CLI module for Tubescribe.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::enrichment::EnhanceOptions;
use clap::{Args, Parser, Subcommand};

/// Tubescribe - captions and metadata for online video
///
/// Fetches captions and metadata for single videos and whole playlists,
/// with optional AI summaries, translations and key topics.
#[derive(Parser, Debug)]
#[command(name = "tubescribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Fetch metadata and captions for one video
    Video {
        /// Video URL or 11-character ID
        locator: String,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Fetch metadata and captions for every video of a playlist
    Playlist {
        /// Playlist URL (or a watch URL carrying &list=)
        locator: String,

        /// Maximum number of videos to process (default: all)
        #[arg(long)]
        max_items: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Show how a locator is classified
    Classify {
        /// URL or ID to classify
        locator: String,
    },

    /// Print the caption track of a video
    Captions {
        /// Video URL or 11-character ID
        locator: String,

        /// Preferred caption languages, in order (default: from config)
        #[arg(short, long, value_delimiter = ',')]
        lang: Vec<String>,

        /// Output format (txt, json, srt, vtt)
        #[arg(long, default_value = "txt")]
        format: String,
    },

    /// Run AI enrichment over a text file
    Enhance {
        /// Text file to enrich (use '-' for stdin)
        file: String,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Where and how results are written.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format (txt, json, xml, md, srt, vtt)
    #[arg(short, long, default_value = "txt")]
    pub format: String,

    /// Output directory (default: general.output_dir from config)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the rendered result instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

/// Enrichment toggles shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct EnhanceArgs {
    /// Generate an AI summary
    #[arg(long)]
    pub summary: bool,

    /// Extract key topics
    #[arg(long)]
    pub topics: bool,

    /// Translate the transcript into this language (e.g. en, ko)
    #[arg(long, value_name = "LANG")]
    pub translate: Option<String>,

    /// Language for summary and topics (default: from config)
    #[arg(long)]
    pub lang: Option<String>,

    /// Timeout for each AI request in seconds (default: from config)
    #[arg(long, value_name = "SECONDS")]
    pub ai_timeout: Option<f64>,
}

impl EnhanceArgs {
    /// Merge the flags over the configured toggles. A flag turns a feature
    /// on; it never turns a configured one off.
    pub fn to_options(&self, base: EnhanceOptions) -> EnhanceOptions {
        EnhanceOptions {
            summary: base.summary || self.summary,
            topics: base.topics || self.topics,
            translate_to: self.translate.clone().or(base.translate_to),
            language: self.lang.clone().or(base.language),
            timeout_seconds: self.ai_timeout.or(base.timeout_seconds),
            ..base
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "captions.languages")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_with_flags() {
        let cli = Cli::parse_from([
            "tubescribe",
            "video",
            "https://youtu.be/abc123",
            "--format",
            "json",
            "--summary",
            "--translate",
            "en",
        ]);

        match cli.command {
            Commands::Video { locator, output, enhance } => {
                assert_eq!(locator, "https://youtu.be/abc123");
                assert_eq!(output.format, "json");
                assert!(enhance.summary);
                assert!(!enhance.topics);
                assert_eq!(enhance.translate.as_deref(), Some("en"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_captions_languages() {
        let cli = Cli::parse_from(["tubescribe", "captions", "abc", "--lang", "en,ja"]);
        match cli.command {
            Commands::Captions { lang, format, .. } => {
                assert_eq!(lang, vec!["en", "ja"]);
                assert_eq!(format, "txt");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_enhance_args_merge() {
        let base = EnhanceOptions {
            topics: true,
            language: Some("ko".to_string()),
            ..EnhanceOptions::default()
        };
        let args = EnhanceArgs {
            summary: true,
            lang: Some("en".to_string()),
            ai_timeout: Some(15.0),
            ..EnhanceArgs::default()
        };

        let options = args.to_options(base);
        assert!(options.summary);
        assert!(options.topics);
        assert_eq!(options.language.as_deref(), Some("en"));
        assert!(options.translate_to.is_none());
        assert_eq!(options.timeout(), Some(std::time::Duration::from_secs(15)));
    }
}
