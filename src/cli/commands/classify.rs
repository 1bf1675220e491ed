//! Classify command implementation.

use crate::cli::Output;
use crate::locator::{self, LocatorKind};
use anyhow::Result;

/// Print how a locator is classified.
pub fn run_classify(input: &str) -> Result<()> {
    let classification = locator::classify(input);

    Output::header("Locator");
    Output::kv("Input", input);
    Output::kv("Kind", &classification.kind.to_string());
    if let Some(id) = &classification.video_id {
        Output::kv("Video ID", id);
        Output::kv("Watch URL", &locator::watch_url(id));
    }
    if let Some(id) = &classification.collection_id {
        Output::kv("Playlist ID", id);
        Output::kv("Playlist URL", &locator::collection_url(id));
    }

    if classification.kind == LocatorKind::Unrecognized {
        Output::warning("Not a recognizable video or playlist locator");
        return Err(anyhow::anyhow!("Unrecognized locator: {}", input));
    }

    Ok(())
}
