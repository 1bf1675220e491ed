//! Enhance command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{EnhanceArgs, Output};
use crate::config::{Prompts, Settings};
use crate::enrichment::{EnhanceOptions, EnrichmentClient};
use anyhow::{Context, Result};
use std::io::Read;

/// Run AI enrichment over the text in `file` (`-` reads stdin).
pub async fn run_enhance(file: &str, args: &EnhanceArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Enhance, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubescribe doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let text = read_input(file)?;
    if text.trim().is_empty() {
        Output::warning("Input is empty; nothing to enhance");
        return Ok(());
    }

    let mut options = args.to_options(EnhanceOptions::from_settings(&settings.enrichment));
    if !options.is_requested() {
        options.summary = true;
        options.topics = true;
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let client = EnrichmentClient::new(settings.enrichment, prompts);

    Output::info(&format!(
        "Enhancing {} characters with {}",
        text.chars().count(),
        client.settings().model
    ));
    let spinner = Output::spinner("Waiting for the model...");
    let result = client.enhance(&text, &options).await;
    spinner.finish_and_clear();

    if let Some(summary) = &result.summary {
        Output::block("Summary", summary);
    } else if options.summary {
        Output::warning("Summary could not be generated");
    }

    if let Some(topics) = &result.topics {
        println!();
        Output::kv("Topics", "");
        for topic in topics {
            Output::list_item(topic);
        }
    } else if options.topics {
        Output::warning("Topics could not be extracted");
    }

    if let Some(translation) = &result.translation {
        Output::block("Translation", translation);
    } else if options.translate_to.is_some() {
        Output::warning("Translation failed");
    }

    println!();
    Output::success(&format!("Done in {:.1}s", result.elapsed_seconds));
    Ok(())
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    }
}
