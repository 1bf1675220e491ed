//! Playlist command implementation.

use super::video::{emit, resolve_options, resolve_output_dir};
use crate::cli::preflight::{self, Operation};
use crate::cli::{EnhanceArgs, Output, OutputArgs};
use crate::config::Settings;
use crate::orchestrator::{CollectionProgress, ItemResult, Orchestrator};
use crate::output::OutputFormat;
use anyhow::Result;

/// Run the playlist command.
pub async fn run_playlist(
    locator: &str,
    max_items: Option<usize>,
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

    let classification = orchestrator.classify(locator);
    if !classification.is_collection() {
        Output::error("Input doesn't appear to be a playlist URL");
        return Err(anyhow::anyhow!("Not a playlist locator: {}", locator));
    }

    Output::info(&format!("Fetching playlist: {}", locator));
    let spinner = Output::spinner("Fetching video list...");
    let collection = orchestrator.resolve_collection(locator, max_items).await;
    spinner.finish_and_clear();
    let collection = collection?;

    if collection.items.is_empty() {
        Output::warning("No videos found in playlist");
        return Ok(());
    }

    let total = collection.items.len();
    Output::header(&collection.title);
    Output::kv("Owner", &collection.owner_name);
    Output::kv(
        "Videos",
        &format!("{} of {}", total, collection.declared_item_count),
    );
    println!();

    let progress_bar = Output::progress_bar(total as u64, "videos");
    let result = orchestrator
        .process_resolved(collection, &options, |progress| match progress {
            CollectionProgress::Started {
                index,
                total,
                reference,
            } => progress_bar.suspend(|| {
                Output::info(&format!(
                    "[{}/{}] Processing: {}",
                    index + 1,
                    total,
                    reference.title
                ));
            }),
            CollectionProgress::Finished { result, .. } => {
                progress_bar.suspend(|| {
                    report_progress(result);
                    if let Err(e) = emit(result, format, output_args.stdout, &output_dir) {
                        Output::error(&format!("  Failed to write output: {}", e));
                    }
                });
                progress_bar.inc(1);
            }
        })
        .await;
    progress_bar.finish_and_clear();

    let caption_miss_count = result
        .items
        .iter()
        .filter(|item| item.is_success() && item.captions.is_empty())
        .count();

    println!();
    Output::success(&format!(
        "Playlist complete: {} succeeded, {} without captions, {} failed",
        result.success_count, caption_miss_count, result.failure_count
    ));

    Ok(())
}

fn report_progress(result: &ItemResult) {
    if !result.is_success() {
        Output::error(&format!(
            "  Failed: {}",
            result.metadata_failure.as_deref().unwrap_or("unknown error")
        ));
    } else if result.captions.is_empty() {
        Output::warning("  No captions available");
    } else {
        Output::success(&format!(
            "  {} caption entries",
            result.captions.entries().len()
        ));
    }
}
