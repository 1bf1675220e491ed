//! Result rendering (TXT, JSON, XML, Markdown, SRT, VTT).

use crate::captions::CaptionEntry;
use crate::error::{Result, TubescribeError};
use crate::orchestrator::ItemResult;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Invalid filename regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("Invalid separator regex"));

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";
const NO_TRANSCRIPT: &str = "No transcript available for this video.";

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
    Xml,
    Markdown,
    Srt,
    Vtt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "md",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!(
                "Unknown format: {}. Use txt, json, xml, markdown, srt, or vtt.",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Render a per-video result.
pub fn render(result: &ItemResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Txt => Ok(format_txt(result)),
        OutputFormat::Json => format_json(result),
        OutputFormat::Xml => format_xml(result),
        OutputFormat::Markdown => Ok(format_markdown(result)),
        OutputFormat::Srt => Ok(format_srt(result.captions.entries())),
        OutputFormat::Vtt => Ok(format_vtt(result.captions.entries())),
    }
}

/// Render a bare caption track. Formats that need video metadata are
/// rejected.
pub fn render_entries(entries: &[CaptionEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Txt => Ok(entries
            .iter()
            .map(|e| format!("[{}] {}\n", format_timestamp(e.start), e.text.trim()))
            .collect()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        OutputFormat::Srt => Ok(format_srt(entries)),
        OutputFormat::Vtt => Ok(format_vtt(entries)),
        other => Err(TubescribeError::Render(format!(
            "{} is not available for a bare caption track",
            other
        ))),
    }
}

/// File name for a video: sanitized title (at most 50 chars) plus id.
pub fn safe_filename(title: &str, video_id: &str, format: OutputFormat) -> String {
    let stripped = UNSAFE_CHARS.replace_all(title, "");
    let joined = SEPARATORS.replace_all(&stripped, "_");
    let short: String = joined.chars().take(50).collect();
    format!("{}_{}.{}", short, video_id, format.extension())
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Thousands-separated count (`1,234,567`).
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn generated_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn duration_label(result: &ItemResult) -> String {
    result
        .metadata
        .duration_seconds
        .map(|d| format_timestamp(d as f64))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn upload_date_label(result: &ItemResult) -> &str {
    result.metadata.upload_date.as_deref().unwrap_or("Unknown")
}

fn summary(result: &ItemResult) -> Option<&str> {
    result.enrichment.as_ref().and_then(|e| e.summary.as_deref())
}

fn translation(result: &ItemResult) -> Option<&str> {
    result.enrichment.as_ref().and_then(|e| e.translation.as_deref())
}

fn topics(result: &ItemResult) -> Option<&[String]> {
    result
        .enrichment
        .as_ref()
        .and_then(|e| e.topics.as_deref())
        .filter(|t| !t.is_empty())
}

fn format_txt(result: &ItemResult) -> String {
    let meta = &result.metadata;
    let mut out = String::new();

    out.push_str(&format!("{}\nYouTube Video Transcript\n{}\n\n", RULE, RULE));

    out.push_str(&format!("Video Information\n{}\n", THIN_RULE));
    out.push_str(&format!("Title: {}\n", meta.title));
    out.push_str(&format!("Channel: {}\n", meta.channel_name));
    out.push_str(&format!("Upload Date: {}\n", upload_date_label(result)));
    out.push_str(&format!("Duration: {}\n", duration_label(result)));
    out.push_str(&format!("Views: {}\n\n", format_count(meta.view_count.unwrap_or(0))));

    out.push_str(&format!("Description\n{}\n", THIN_RULE));
    out.push_str(&format!("{}\n\n", meta.description.as_deref().unwrap_or("")));

    if let Some(summary) = summary(result) {
        out.push_str(&format!("AI Summary\n{}\n{}\n\n", THIN_RULE, summary));
    }

    if let Some(topics) = topics(result) {
        out.push_str(&format!("Key Topics\n{}\n", THIN_RULE));
        for topic in topics {
            out.push_str(&format!("• {}\n", topic));
        }
        out.push('\n');
    }

    if let Some(translation) = translation(result) {
        out.push_str(&format!("Translation\n{}\n{}\n\n", THIN_RULE, translation));
    }

    let entries = result.captions.entries();
    if entries.is_empty() {
        out.push_str(&format!("Transcript\n{}\n{}\n", RULE, NO_TRANSCRIPT));
    } else {
        out.push_str(&format!("Transcript with Timestamps\n{}\n\n", RULE));
        for entry in entries {
            out.push_str(&format!("[{}] {}\n", format_timestamp(entry.start), entry.text.trim()));
        }
        out.push_str(&format!("\n{}\nTotal transcript entries: {}\n", RULE, entries.len()));
    }

    out.push_str(&format!("\nGenerated on: {}\n", generated_at()));
    out
}

#[derive(Serialize)]
struct JsonExport<'a> {
    video_info: VideoInfoExport<'a>,
    description: &'a str,
    transcript: Vec<EntryExport>,
    metadata: ExportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_topics: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
}

#[derive(Serialize)]
struct VideoInfoExport<'a> {
    video_id: &'a str,
    title: &'a str,
    channel: &'a str,
    upload_date: Option<&'a str>,
    duration: Option<u64>,
    duration_formatted: String,
    view_count: Option<u64>,
    like_count: Option<u64>,
    thumbnail_url: Option<&'a str>,
}

#[derive(Serialize)]
struct EntryExport {
    timestamp: String,
    start_seconds: f64,
    duration: f64,
    text: String,
}

#[derive(Serialize)]
struct ExportMetadata {
    total_entries: usize,
    generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption_strategy: Option<String>,
}

impl<'a> VideoInfoExport<'a> {
    fn from_result(result: &'a ItemResult) -> Self {
        let meta = &result.metadata;
        Self {
            video_id: &meta.video_id,
            title: &meta.title,
            channel: &meta.channel_name,
            upload_date: meta.upload_date.as_deref(),
            duration: meta.duration_seconds,
            duration_formatted: duration_label(result),
            view_count: meta.view_count,
            like_count: meta.like_count,
            thumbnail_url: meta.thumbnail_url.as_deref(),
        }
    }
}

fn entry_exports(entries: &[CaptionEntry]) -> Vec<EntryExport> {
    entries
        .iter()
        .map(|e| EntryExport {
            timestamp: format_timestamp(e.start),
            start_seconds: e.start,
            duration: e.duration,
            text: e.text.trim().to_string(),
        })
        .collect()
}

fn export_metadata(result: &ItemResult) -> ExportMetadata {
    let track = result.captions.track();
    ExportMetadata {
        total_entries: result.captions.entries().len(),
        generated_at: generated_at(),
        caption_language: track.and_then(|t| t.language.clone()),
        caption_strategy: track.map(|t| t.strategy.to_string()),
    }
}

fn format_json(result: &ItemResult) -> Result<String> {
    let export = JsonExport {
        video_info: VideoInfoExport::from_result(result),
        description: result.metadata.description.as_deref().unwrap_or(""),
        transcript: entry_exports(result.captions.entries()),
        metadata: export_metadata(result),
        ai_summary: summary(result),
        key_topics: topics(result),
        translation: translation(result),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

#[derive(Serialize)]
#[serde(rename = "youtube_transcript")]
struct XmlExport<'a> {
    video_info: VideoInfoExport<'a>,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_topics: Option<XmlTopics<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
    transcript: XmlTranscript,
    metadata: ExportMetadata,
}

#[derive(Serialize)]
struct XmlTopics<'a> {
    topic: &'a [String],
}

#[derive(Serialize)]
struct XmlTranscript {
    entry: Vec<EntryExport>,
}

fn format_xml(result: &ItemResult) -> Result<String> {
    let export = XmlExport {
        video_info: VideoInfoExport::from_result(result),
        description: result.metadata.description.as_deref().unwrap_or(""),
        ai_summary: summary(result),
        key_topics: topics(result).map(|topic| XmlTopics { topic }),
        translation: translation(result),
        transcript: XmlTranscript {
            entry: entry_exports(result.captions.entries()),
        },
        metadata: export_metadata(result),
    };

    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    export
        .serialize(serializer)
        .map_err(|e| TubescribeError::Render(format!("XML serialization failed: {}", e)))?;

    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", body))
}

fn format_markdown(result: &ItemResult) -> String {
    let meta = &result.metadata;
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", meta.title));

    out.push_str("## Video Information\n\n");
    out.push_str(&format!("- **Title**: {}\n", meta.title));
    out.push_str(&format!("- **Channel**: {}\n", meta.channel_name));
    out.push_str(&format!("- **Upload Date**: {}\n", upload_date_label(result)));
    out.push_str(&format!("- **Duration**: {}\n", duration_label(result)));
    out.push_str(&format!("- **Views**: {}\n\n", format_count(meta.view_count.unwrap_or(0))));

    out.push_str("## Description\n\n");
    out.push_str(&format!("{}\n\n", meta.description.as_deref().unwrap_or("")));

    if let Some(summary) = summary(result) {
        out.push_str(&format!("## AI Summary\n\n{}\n\n", summary));
    }

    if let Some(topics) = topics(result) {
        out.push_str("## Key Topics\n\n");
        for topic in topics {
            out.push_str(&format!("- {}\n", topic));
        }
        out.push('\n');
    }

    if let Some(translation) = translation(result) {
        out.push_str(&format!("## Translation\n\n{}\n\n", translation));
    }

    out.push_str("## Transcript\n\n");
    let entries = result.captions.entries();
    if entries.is_empty() {
        out.push_str(&format!("{}\n\n", NO_TRANSCRIPT));
    } else {
        out.push_str("| Timestamp | Text |\n|-----------|------|\n");
        for entry in entries {
            let text = entry.text.trim().replace('\n', " ").replace('|', "\\|");
            out.push_str(&format!("| `{}` | {} |\n", format_timestamp(entry.start), text));
        }
        out.push_str(&format!("\n**Total transcript entries**: {}\n\n", entries.len()));
    }

    out.push_str(&format!("---\n\n*Generated on: {}*\n", generated_at()));
    out
}

/// Format as SRT (SubRip).
fn format_srt(entries: &[CaptionEntry]) -> String {
    let mut output = String::new();

    for (i, entry) in entries.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_cue_timestamp(entry.start, ','),
            format_cue_timestamp(entry.end(), ',')
        ));
        output.push_str(&entry.text);
        output.push_str("\n\n");
    }

    output
}

/// Format as WebVTT.
fn format_vtt(entries: &[CaptionEntry]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for (i, entry) in entries.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_cue_timestamp(entry.start, '.'),
            format_cue_timestamp(entry.end(), '.')
        ));
        output.push_str(&entry.text);
        output.push_str("\n\n");
    }

    output
}

/// Cue timestamp `00:00:00,000` (SRT) or `00:00:00.000` (VTT).
fn format_cue_timestamp(seconds: f64, separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionOutcome, CaptionTrack, Generation, Strategy};
    use crate::enrichment::EnrichmentResult;
    use crate::metadata::{ItemMetadata, ItemReference};

    fn sample_result(with_captions: bool) -> ItemResult {
        let captions = if with_captions {
            CaptionOutcome::Acquired(CaptionTrack {
                entries: vec![
                    CaptionEntry {
                        start: 0.0,
                        duration: 2.5,
                        text: "Hello world.".to_string(),
                    },
                    CaptionEntry {
                        start: 65.0,
                        duration: 2.5,
                        text: "Pipes | here".to_string(),
                    },
                ],
                strategy: Strategy::AllLanguages,
                language: Some("en".to_string()),
                origin: None,
                generation: Generation::Modern,
            })
        } else {
            CaptionOutcome::Empty { attempts: vec![] }
        };

        ItemResult {
            reference: ItemReference::single("abc123"),
            metadata: ItemMetadata {
                video_id: "abc123".to_string(),
                title: "Rust & You: A Guide!".to_string(),
                channel_name: "Ferris".to_string(),
                upload_date: Some("2024-01-15".to_string()),
                duration_seconds: Some(3725),
                view_count: Some(1234567),
                like_count: Some(10),
                description: Some("About <Rust>".to_string()),
                thumbnail_url: None,
            },
            metadata_failure: None,
            captions,
            enrichment: Some(EnrichmentResult {
                summary: Some("1. Point".to_string()),
                translation: None,
                topics: Some(vec!["ownership".to_string(), "borrowing".to_string()]),
                elapsed_seconds: 1.0,
            }),
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.9), "01:05");
        assert_eq!(format_timestamp(3725.0), "01:02:05");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(
            safe_filename("Rust & You: A Guide!", "abc123", OutputFormat::Txt),
            "Rust_You_A_Guide_abc123.txt"
        );
        let long = "a".repeat(80);
        let name = safe_filename(&long, "id", OutputFormat::Markdown);
        assert_eq!(name, format!("{}_id.md", "a".repeat(50)));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert_eq!("webvtt".parse::<OutputFormat>().unwrap(), OutputFormat::Vtt);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_txt() {
        let txt = render(&sample_result(true), OutputFormat::Txt).unwrap();
        assert!(txt.contains("Title: Rust & You: A Guide!"));
        assert!(txt.contains("Duration: 01:02:05"));
        assert!(txt.contains("Views: 1,234,567"));
        assert!(txt.contains("• ownership"));
        assert!(txt.contains("[01:05] Pipes | here"));
        assert!(txt.contains("Total transcript entries: 2"));
        assert!(!txt.contains("Translation"));
    }

    #[test]
    fn test_empty_transcript_message() {
        let txt = render(&sample_result(false), OutputFormat::Txt).unwrap();
        assert!(txt.contains(NO_TRANSCRIPT));
        let md = render(&sample_result(false), OutputFormat::Markdown).unwrap();
        assert!(md.contains(NO_TRANSCRIPT));
    }

    #[test]
    fn test_format_json() {
        let json = render(&sample_result(true), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["video_info"]["duration_formatted"], "01:02:05");
        assert_eq!(value["transcript"][1]["timestamp"], "01:05");
        assert_eq!(value["metadata"]["total_entries"], 2);
        assert_eq!(value["ai_summary"], "1. Point");
        assert_eq!(value["key_topics"][1], "borrowing");
        assert!(value.get("translation").is_none());
    }

    #[test]
    fn test_format_xml() {
        let xml = render(&sample_result(true), OutputFormat::Xml).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<youtube_transcript>"));
        assert!(xml.contains("<topic>ownership</topic>"));
        assert!(xml.contains("About &lt;Rust&gt;"));
        assert!(xml.contains("<timestamp>01:05</timestamp>"));
    }

    #[test]
    fn test_format_markdown_escapes_pipes() {
        let md = render(&sample_result(true), OutputFormat::Markdown).unwrap();
        assert!(md.starts_with("# Rust & You: A Guide!"));
        assert!(md.contains("| `01:05` | Pipes \\| here |"));
        assert!(md.contains("## AI Summary"));
    }

    #[test]
    fn test_format_srt_and_vtt() {
        let result = sample_result(true);
        let srt = render(&result, OutputFormat::Srt).unwrap();
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500"));
        assert!(srt.contains("2\n00:01:05,000 --> 00:01:07,500"));

        let vtt = render(&result, OutputFormat::Vtt).unwrap();
        assert!(vtt.starts_with("WEBVTT"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500"));
    }

    #[test]
    fn test_render_entries() {
        let result = sample_result(true);
        let entries = result.captions.entries();

        let txt = render_entries(entries, OutputFormat::Txt).unwrap();
        assert_eq!(txt, "[00:00] Hello world.\n[01:05] Pipes | here\n");

        let json = render_entries(entries, OutputFormat::Json).unwrap();
        let parsed: Vec<CaptionEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);

        assert!(matches!(
            render_entries(entries, OutputFormat::Xml),
            Err(TubescribeError::Render(_))
        ));
    }
}
