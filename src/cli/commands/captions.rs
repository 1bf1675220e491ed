//! Captions command implementation.

use crate::captions::{CaptionEngine, CaptionOutcome};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{CaptionBackendKind, Settings};
use crate::locator;
use crate::output::{render_entries, OutputFormat};
use anyhow::Result;

/// Run the captions command. The rendered track goes to stdout.
pub async fn run_captions(
    locator: &str,
    languages: &[String],
    format: &str,
    settings: Settings,
) -> Result<()> {
    if settings.captions.backend == CaptionBackendKind::Ytdlp {
        if let Err(e) = preflight::check(Operation::Fetch, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'tubescribe doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let classification = locator::classify(locator);
    let video_id = classification.require_video_id(locator)?;

    let engine = CaptionEngine::from_settings(&settings.captions);
    let languages = if languages.is_empty() {
        engine.languages().to_vec()
    } else {
        languages.to_vec()
    };

    let outcome = engine.acquire_with_languages(video_id, &languages).await;
    if let CaptionOutcome::Empty { attempts } = &outcome {
        Output::warning(&format!("No captions available for {}", video_id));
        for attempt in attempts {
            eprintln!("  {}: {}", attempt.strategy, attempt.reason);
        }
    }

    let track = outcome.into_result(video_id)?;
    print!("{}", render_entries(&track.entries, format)?);
    Ok(())
}
