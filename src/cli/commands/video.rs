//! Video command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{EnhanceArgs, Output, OutputArgs};
use crate::config::Settings;
use crate::enrichment::EnhanceOptions;
use crate::orchestrator::{ItemResult, Orchestrator};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the video command.
pub async fn run_video(
    locator: &str,
    output_args: &OutputArgs,
    enhance_args: &EnhanceArgs,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Fetch, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubescribe doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let format: OutputFormat = output_args
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let options = resolve_options(enhance_args, &settings);
    let output_dir = resolve_output_dir(output_args, &settings);

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Processing: {}", locator));
    let spinner = Output::spinner("Fetching metadata and captions...");
    let result = orchestrator.process_video(locator, &options).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to process: {}", e));
            return Err(e.into());
        }
    };

    report_item(&result);
    emit(&result, format, output_args.stdout, &output_dir)?;

    Ok(())
}

/// Merge enrichment flags over the configured toggles and warn when they
/// cannot be honored.
pub(crate) fn resolve_options(args: &EnhanceArgs, settings: &Settings) -> EnhanceOptions {
    let options = args.to_options(EnhanceOptions::from_settings(&settings.enrichment));
    if options.is_requested() {
        if let Err(e) = preflight::check(Operation::Enhance, settings) {
            Output::warning(&format!("AI features will be skipped: {}", e));
        }
    }
    options
}

pub(crate) fn resolve_output_dir(args: &OutputArgs, settings: &Settings) -> PathBuf {
    args.output
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(|| settings.output_dir())
}

/// Print what was obtained for one item.
pub(crate) fn report_item(result: &ItemResult) {
    Output::video_info(
        &result.metadata.title,
        &result.reference.id,
        result.captions.entries().len(),
        result.metadata.duration_seconds,
    );

    if let Some(failure) = &result.metadata_failure {
        Output::warning(&format!("  Metadata unavailable: {}", failure));
    }

    match result.captions.track() {
        Some(track) => Output::kv(
            "Captions",
            &format!(
                "{} entries via {} ({})",
                track.len(),
                track.strategy,
                track.language.as_deref().unwrap_or("unknown language")
            ),
        ),
        None => Output::warning("  No captions available"),
    }

    if let Some(enrichment) = &result.enrichment {
        if let Some(summary) = &enrichment.summary {
            Output::block("Summary", summary);
        }
        if let Some(topics) = &enrichment.topics {
            println!();
            Output::kv("Topics", "");
            for topic in topics {
                Output::list_item(topic);
            }
        }
        if let Some(translation) = &enrichment.translation {
            println!();
            Output::kv("Translation", "");
            Output::preview(translation);
        }
    }
}

/// Print the rendered result or write it to `dir`.
pub(crate) fn emit(result: &ItemResult, format: OutputFormat, to_stdout: bool, dir: &Path) -> Result<()> {
    if to_stdout {
        println!("{}", output::render(result, format)?);
    } else {
        let path = output::write_result(result, format, dir)?;
        Output::success(&format!("Saved {}", path.display()));
    }
    Ok(())
}
