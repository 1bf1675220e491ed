//! Tubescribe - captions and metadata for online video
//!
//! Fetches caption tracks and descriptive metadata for single videos and
//! whole playlists, with optional AI summaries, translations and key
//! topics generated by an OpenAI-compatible model.
//!
//! # Overview
//!
//! Tubescribe allows you to:
//! - Classify a URL as a video, a playlist, or neither
//! - Fetch normalized metadata for a video, or resolve a playlist into its items
//! - Acquire captions through a fixed cascade of strategies that works
//!   against both current and older caption provider interfaces
//! - Summarize, translate and extract topics from a transcript
//! - Render results as TXT, JSON, XML, Markdown, SRT or WebVTT
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `locator` - URL and identifier classification
//! - `metadata` - Video metadata and playlist resolution
//! - `captions` - Multi-strategy caption acquisition
//! - `enrichment` - Generative summaries, translations and topics
//! - `orchestrator` - Pipeline coordination
//! - `output` - Result rendering and file naming
//!
//! # Example
//!
//! ```rust,no_run
//! use tubescribe::config::Settings;
//! use tubescribe::enrichment::EnhanceOptions;
//! use tubescribe::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator
//!         .process_video("https://youtu.be/dQw4w9WgXcQ", &EnhanceOptions::default())
//!         .await?;
//!     println!("{}: {} caption entries", result.metadata.title, result.captions.entries().len());
//!
//!     Ok(())
//! }
//! ```

pub mod captions;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod locator;
pub mod metadata;
pub mod openai;
pub mod orchestrator;
pub mod output;
pub mod ytdlp;

pub use error::{Result, TubescribeError};
