//! Topic-list parsing.

use regex::Regex;
use std::sync::LazyLock;

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("Invalid ordinal regex"));

const BULLETS: &[char] = &['-', '•', '*'];

/// Parse a provider's multi-line topic list, keeping at most `limit` topics.
pub fn parse_topics(raw: &str, limit: usize) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_marker)
        .filter(|topic| !topic.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn strip_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(BULLETS) {
        return rest.trim();
    }
    match ORDINAL.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    }
}
