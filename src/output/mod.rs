//! Rendering and writing per-video results.

mod format;

pub use format::{format_count, format_timestamp, render, render_entries, safe_filename, OutputFormat};

use crate::error::{Result, TubescribeError};
use crate::orchestrator::ItemResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Render `result` and write it into `dir` under its safe file name.
pub fn write_result(result: &ItemResult, format: OutputFormat, dir: &Path) -> Result<PathBuf> {
    let content = render(result, format)?;
    let name = safe_filename(&result.metadata.title, &result.reference.id, format);
    let path = dir.join(name);
    write_atomic(&path, &content)?;
    Ok(path)
}

/// Write `content` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut file = tempfile::NamedTempFile::new_in(&parent)?;
    file.write_all(content.as_bytes())?;
    file.persist(path)
        .map_err(|e| TubescribeError::Io(e.error))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::CaptionOutcome;
    use crate::metadata::{ItemMetadata, ItemReference};

    #[test]
    fn test_write_result_uses_safe_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut metadata = ItemMetadata::sentinel("abc123");
        metadata.title = "Hello, World".to_string();
        let result = ItemResult {
            reference: ItemReference::single("abc123"),
            metadata,
            metadata_failure: None,
            captions: CaptionOutcome::Empty { attempts: vec![] },
            enrichment: None,
        };

        let path = write_result(&result, OutputFormat::Markdown, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "Hello_World_abc123.md");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Hello, World"));
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        write_atomic(&path, "content").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }
}
