//! Budget-bounded text truncation.

/// Sentence-terminal delimiters considered when cutting.
const SENTENCE_DELIMITERS: &[&str] = &[". ", "! ", "? ", "\n\n", ".\n", "!\n", "?\n", "。"];

/// Fraction of the budget a cut must keep.
const MIN_KEEP_RATIO: f64 = 0.8;

/// Truncate `text` to at most `budget` characters.
///
/// Prefers a cut right after the last sentence delimiter in the final 20%
/// of the budget, then the last word boundary in that window, then a hard
/// cut at the budget.
pub fn truncate_text(text: &str, budget: usize) -> &str {
    if text.chars().count() <= budget {
        return text;
    }

    let boundary = byte_offset(text, budget);
    let floor = byte_offset(text, (budget as f64 * MIN_KEEP_RATIO).ceil() as usize);
    let window = &text[..boundary];

    let sentence_cut = SENTENCE_DELIMITERS
        .iter()
        .filter_map(|delim| {
            window
                .rfind(delim)
                .filter(|pos| *pos >= floor)
                .map(|pos| pos + delim.len())
        })
        .max();
    if let Some(cut) = sentence_cut {
        return &text[..cut];
    }

    let word_cut = window
        .char_indices()
        .rev()
        .take_while(|(pos, _)| *pos >= floor)
        .find(|(_, c)| c.is_whitespace())
        .map(|(pos, _)| pos);
    if let Some(cut) = word_cut {
        return &text[..cut];
    }

    window
}

/// Byte offset of the `n`th character, or the text length.
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(pos, _)| pos)
        .unwrap_or(text.len())
}
