//! Pipeline orchestrator for Tubescribe.
//!
//! Runs metadata retrieval, caption acquisition and optional enrichment for
//! one video, and walks playlists one item at a time.

use crate::captions::{CaptionEngine, CaptionOutcome};
use crate::config::{Prompts, Settings};
use crate::enrichment::{EnhanceOptions, EnrichmentClient, EnrichmentResult};
use crate::error::{Result, TubescribeError};
use crate::locator::{self, Classification};
use crate::metadata::{
    CollectionReference, ItemMetadata, ItemReference, MetadataFetcher, YtDlpMetadata,
    UNKNOWN_TITLE,
};
use crate::ytdlp::YtDlp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything produced for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub reference: ItemReference,
    pub metadata: ItemMetadata,
    /// Why sentinel metadata was used, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_failure: Option<String>,
    pub captions: CaptionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentResult>,
}

impl ItemResult {
    /// An item succeeds when its metadata was actually retrieved.
    pub fn is_success(&self) -> bool {
        self.metadata_failure.is_none()
    }
}

/// Aggregate over a processed playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub collection: CollectionReference,
    pub items: Vec<ItemResult>,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Per-item notifications while a playlist is processed. `index` is the
/// zero-based position within the processed (possibly capped) list.
#[derive(Debug)]
pub enum CollectionProgress<'a> {
    Started {
        index: usize,
        total: usize,
        reference: &'a ItemReference,
    },
    Finished {
        index: usize,
        total: usize,
        result: &'a ItemResult,
    },
}

/// The main orchestrator for the Tubescribe pipeline.
pub struct Orchestrator {
    settings: Settings,
    metadata: MetadataFetcher,
    captions: CaptionEngine,
    enrichment: EnrichmentClient,
}

impl Orchestrator {
    /// Create an orchestrator with the yt-dlp backed components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let tool = YtDlp::new().with_timeout(settings.captions.timeout());
        let metadata = MetadataFetcher::new(Arc::new(YtDlpMetadata::with_tool(tool)));
        let captions = CaptionEngine::from_settings(&settings.captions);
        info!(
            "Caption backend {} with languages {:?}",
            settings.captions.backend, settings.captions.languages
        );
        let enrichment = EnrichmentClient::new(settings.enrichment.clone(), prompts);

        Ok(Self {
            settings,
            metadata,
            captions,
            enrichment,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        metadata: MetadataFetcher,
        captions: CaptionEngine,
        enrichment: EnrichmentClient,
    ) -> Self {
        Self {
            settings,
            metadata,
            captions,
            enrichment,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata(&self) -> &MetadataFetcher {
        &self.metadata
    }

    pub fn captions(&self) -> &CaptionEngine {
        &self.captions
    }

    pub fn enrichment(&self) -> &EnrichmentClient {
        &self.enrichment
    }

    pub fn classify(&self, locator: &str) -> Classification {
        locator::classify(locator)
    }

    /// Process one video locator.
    ///
    /// A playlist URL that also names a video (`watch?v=..&list=..`) is
    /// processed as that video.
    #[instrument(skip(self, options), fields(locator = %locator))]
    pub async fn process_video(&self, locator: &str, options: &EnhanceOptions) -> Result<ItemResult> {
        let classification = locator::classify(locator);
        let video_id = classification.require_video_id(locator)?;
        Ok(self
            .process_item(ItemReference::single(video_id), options)
            .await)
    }

    /// Process one resolved item. Never fails; problems are recorded in
    /// the result.
    pub async fn process_item(&self, reference: ItemReference, options: &EnhanceOptions) -> ItemResult {
        let report = self.metadata.fetch_metadata_report(&reference.url).await;
        let captions = self.captions.acquire(&reference.id).await;

        let enrichment = if !options.is_requested() {
            None
        } else if !self.enrichment.is_available() {
            warn!("Enrichment requested but unavailable; skipping");
            None
        } else if let Some(track) = captions.track() {
            Some(self.enrichment.enhance_track(&track.entries, options).await)
        } else {
            debug!("No captions for {}, skipping enrichment", reference.id);
            None
        };

        let mut reference = reference;
        if !report.metadata.is_sentinel() && reference.title == UNKNOWN_TITLE {
            reference.title = report.metadata.title.clone();
        }

        ItemResult {
            reference,
            metadata: report.metadata,
            metadata_failure: report.failure,
            captions,
            enrichment,
        }
    }

    /// Resolve a playlist without processing its items.
    pub async fn resolve_collection(&self, locator: &str, max_items: Option<usize>) -> Result<CollectionReference> {
        let mut collection = self.metadata.resolve_collection(locator).await?;
        if let Some(max) = max_items.or(self.settings.collection.max_items) {
            collection.truncate(max);
        }
        Ok(collection)
    }

    /// Process every item of a playlist, one at a time, in position order.
    pub async fn process_collection(
        &self,
        locator: &str,
        max_items: Option<usize>,
        options: &EnhanceOptions,
    ) -> Result<CollectionResult> {
        self.process_collection_with(locator, max_items, options, |_| {})
            .await
    }

    /// [`Self::process_collection`], reporting each item as it starts and
    /// finishes.
    #[instrument(skip(self, options, on_progress), fields(locator = %locator))]
    pub async fn process_collection_with<F>(
        &self,
        locator: &str,
        max_items: Option<usize>,
        options: &EnhanceOptions,
        on_progress: F,
    ) -> Result<CollectionResult>
    where
        F: FnMut(CollectionProgress<'_>),
    {
        let collection = self.resolve_collection(locator, max_items).await?;
        if collection.items.is_empty() {
            return Err(TubescribeError::VideoNotFound(format!(
                "Playlist {} has no videos",
                collection.id
            )));
        }
        Ok(self.process_resolved(collection, options, on_progress).await)
    }

    /// Process the items of an already resolved playlist.
    pub async fn process_resolved<F>(
        &self,
        collection: CollectionReference,
        options: &EnhanceOptions,
        mut on_progress: F,
    ) -> CollectionResult
    where
        F: FnMut(CollectionProgress<'_>),
    {
        let total = collection.items.len();
        info!("Processing {} videos from '{}'", total, collection.title);

        let mut items = Vec::with_capacity(total);
        let mut success_count = 0;
        let mut failure_count = 0;

        for (index, reference) in collection.items.iter().enumerate() {
            debug!("[{}/{}] {}", index + 1, total, reference.id);
            on_progress(CollectionProgress::Started {
                index,
                total,
                reference,
            });

            let result = self.process_item(reference.clone(), options).await;
            if result.is_success() {
                success_count += 1;
            } else {
                warn!(
                    "Item {} ({}) failed: {}",
                    reference.position,
                    reference.id,
                    result.metadata_failure.as_deref().unwrap_or("unknown error")
                );
                failure_count += 1;
            }

            on_progress(CollectionProgress::Finished {
                index,
                total,
                result: &result,
            });
            items.push(result);
        }

        info!(
            "Playlist complete: {} succeeded, {} failed",
            success_count, failure_count
        );

        CollectionResult {
            collection,
            items,
            success_count,
            failure_count,
        }
    }
}
