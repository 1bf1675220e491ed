//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for metadata, captions, playlists and AI
//! enrichment.

use crate::cli::Output;
use crate::config::{positive_duration, Settings};
use crate::enrichment::{EnhanceOptions, EnrichmentClient};
use crate::error::TubescribeError;
use crate::orchestrator::Orchestrator;
use crate::output::{self, OutputFormat};
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or(&settings.server.host).to_string();
    let port = port.unwrap_or(settings.server.port);
    let orchestrator = Orchestrator::new(settings)?;
    let ai_available = orchestrator.enrichment().is_available();

    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Tubescribe API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Video info", "POST /video/info");
    Output::kv("Video scrape", "POST /video/scrape");
    Output::kv("Playlist info", "POST /playlist/info");
    Output::kv("Playlist check", "POST /playlist/check");
    Output::kv("Playlist videos", "POST /playlist/videos");
    Output::kv("AI status", "GET  /ai/status");
    Output::kv("AI", "POST /ai/summary, /ai/translate, /ai/topics, /ai/enhance");
    println!();
    if !ai_available {
        Output::warning("No API key configured; /ai endpoints will answer 503.");
    }
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/video/info", post(video_info))
        .route("/video/scrape", post(video_scrape))
        .route("/playlist/info", post(playlist_info))
        .route("/playlist/check", post(playlist_check))
        .route("/playlist/videos", post(playlist_videos))
        .route("/ai/status", get(ai_status))
        .route("/ai/summary", post(ai_summary))
        .route("/ai/translate", post(ai_translate))
        .route("/ai/topics", post(ai_topics))
        .route("/ai/enhance", post(ai_enhance))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}

/// Tag every response with an `x-request-id` and log it.
async fn request_id(req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    info!(
        request_id = %id,
        status = response.status().as_u16(),
        "{} {} in {:.2}s",
        method,
        path,
        started.elapsed().as_secs_f64()
    );
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct LocatorRequest {
    /// Video or playlist URL
    url: String,
}

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
    /// Also render the result in this format (txt, json, xml, md, srt, vtt)
    #[serde(default)]
    format: Option<String>,
    #[serde(flatten)]
    options: EnhanceOptions,
}

#[derive(Deserialize)]
struct PlaylistRequest {
    url: String,
    #[serde(default)]
    max_items: Option<usize>,
    #[serde(flatten)]
    options: EnhanceOptions,
}

#[derive(Serialize)]
struct PlaylistCheckResponse {
    is_playlist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_id: Option<String>,
}

#[derive(Serialize)]
struct ScrapeResponse {
    #[serde(flatten)]
    result: crate::orchestrator::ItemResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    rendered: Option<String>,
}

#[derive(Deserialize)]
struct SummaryRequest {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    max_points: Option<usize>,
    #[serde(default)]
    timeout_seconds: Option<f64>,
}

#[derive(Deserialize)]
struct TranslateRequest {
    text: String,
    target_language: String,
    #[serde(default)]
    source_language: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<f64>,
}

#[derive(Deserialize)]
struct TopicsRequest {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    num_topics: Option<usize>,
    #[serde(default)]
    timeout_seconds: Option<f64>,
}

#[derive(Deserialize)]
struct EnhanceRequest {
    text: String,
    #[serde(flatten)]
    options: EnhanceOptions,
}

#[derive(Serialize)]
struct AiStatusResponse {
    available: bool,
    model: String,
    language: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error half of every handler.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn generation_failed(feature: &str) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            format!("{} generation failed after retries", feature),
        )
    }
}

impl From<TubescribeError> for ApiError {
    fn from(e: TubescribeError) -> Self {
        let status = match &e {
            TubescribeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TubescribeError::VideoNotFound(_) => StatusCode::NOT_FOUND,
            TubescribeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TubescribeError::MetadataSource(_)
            | TubescribeError::ToolFailed(_)
            | TubescribeError::ToolNotFound(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("{} {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn video_info(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocatorRequest>,
) -> ApiResult<crate::metadata::ItemMetadata> {
    let classification = state.orchestrator.classify(&req.url);
    classification.require_video_id(&req.url)?;
    let metadata = state
        .orchestrator
        .metadata()
        .fetch_metadata_strict(&req.url)
        .await?;
    Ok(Json(metadata))
}

async fn video_scrape(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScrapeRequest>,
) -> ApiResult<ScrapeResponse> {
    let format: Option<OutputFormat> = req
        .format
        .as_deref()
        .map(str::parse::<OutputFormat>)
        .transpose()
        .map_err(|e: String| ApiError::new(StatusCode::BAD_REQUEST, e))?;

    let result = state.orchestrator.process_video(&req.url, &req.options).await?;
    let rendered = match format {
        Some(format) => Some(output::render(&result, format)?),
        None => None,
    };
    Ok(Json(ScrapeResponse { result, rendered }))
}

async fn playlist_info(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaylistRequest>,
) -> ApiResult<crate::metadata::CollectionReference> {
    let collection = state
        .orchestrator
        .resolve_collection(&req.url, req.max_items)
        .await?;
    Ok(Json(collection))
}

async fn playlist_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocatorRequest>,
) -> Json<PlaylistCheckResponse> {
    let classification = state.orchestrator.classify(&req.url);
    Json(PlaylistCheckResponse {
        is_playlist: classification.is_collection(),
        playlist_id: classification.collection_id,
        video_id: classification.video_id,
    })
}

async fn playlist_videos(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaylistRequest>,
) -> ApiResult<crate::orchestrator::CollectionResult> {
    let result = state
        .orchestrator
        .process_collection(&req.url, req.max_items, &req.options)
        .await?;
    Ok(Json(result))
}

async fn ai_status(State(state): State<Arc<AppState>>) -> Json<AiStatusResponse> {
    let enrichment = state.orchestrator.enrichment();
    Json(AiStatusResponse {
        available: enrichment.is_available(),
        model: enrichment.settings().model.clone(),
        language: enrichment.settings().language.clone(),
    })
}

fn require_enrichment(state: &AppState) -> Result<&EnrichmentClient, TubescribeError> {
    let enrichment = state.orchestrator.enrichment();
    if !enrichment.is_available() {
        return Err(TubescribeError::Unavailable(
            "AI enrichment is not configured (no API key)".to_string(),
        ));
    }
    Ok(enrichment)
}

async fn ai_summary(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummaryRequest>,
) -> ApiResult<serde_json::Value> {
    let enrichment = require_enrichment(&state)?;
    let settings = enrichment.settings();
    let language = req.language.as_deref().unwrap_or(&settings.language);
    let points = req.max_points.unwrap_or(settings.max_summary_points);

    let summary = enrichment
        .summarize(
            &req.text,
            points,
            language,
            req.timeout_seconds.and_then(positive_duration),
        )
        .await
        .ok_or_else(|| ApiError::generation_failed("Summary"))?;
    Ok(Json(serde_json::json!({ "summary": summary, "language": language })))
}

async fn ai_translate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranslateRequest>,
) -> ApiResult<serde_json::Value> {
    let enrichment = require_enrichment(&state)?;

    let translation = enrichment
        .translate(
            &req.text,
            &req.target_language,
            req.source_language.as_deref(),
            req.timeout_seconds.and_then(positive_duration),
        )
        .await
        .ok_or_else(|| ApiError::generation_failed("Translation"))?;
    Ok(Json(serde_json::json!({
        "translation": translation,
        "target_language": req.target_language,
    })))
}

async fn ai_topics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TopicsRequest>,
) -> ApiResult<serde_json::Value> {
    let enrichment = require_enrichment(&state)?;
    let settings = enrichment.settings();
    let language = req.language.as_deref().unwrap_or(&settings.language);
    let count = req.num_topics.unwrap_or(settings.num_topics);

    let topics = enrichment
        .extract_topics(
            &req.text,
            count,
            language,
            req.timeout_seconds.and_then(positive_duration),
        )
        .await
        .ok_or_else(|| ApiError::generation_failed("Topic"))?;
    Ok(Json(serde_json::json!({ "topics": topics })))
}

async fn ai_enhance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnhanceRequest>,
) -> ApiResult<crate::enrichment::EnrichmentResult> {
    let enrichment = require_enrichment(&state)?;
    Ok(Json(enrichment.enhance(&req.text, &req.options).await))
}
