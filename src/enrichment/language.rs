//! Display names for language codes used in prompts.

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("ko", "Korean"),
    ("en", "English"),
    ("ja", "Japanese"),
    ("zh", "Chinese"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
];

/// English display name for a language code; unknown codes are returned as-is.
pub fn language_name(code: &str) -> &str {
    let base = code.split(['-', '_']).next().unwrap_or(code);
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(base))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(language_name("ko"), "Korean");
        assert_eq!(language_name("EN"), "English");
        assert_eq!(language_name("pt-BR"), "Portuguese");
    }

    #[test]
    fn test_unknown_code_passthrough() {
        assert_eq!(language_name("tlh"), "tlh");
    }
}
