//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Trim `value` and cap it at `max_chars` characters.
///
/// Falls back to `fallback` (trimmed and capped the same way) when the
/// trimmed input is empty.
pub fn sanitize_text(value: &str, max_chars: usize, fallback: &str) -> String {
    let trimmed = value.trim();
    let source = if trimmed.is_empty() {
        fallback.trim()
    } else {
        trimmed
    };
    source.chars().take(max_chars).collect()
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn sanitize_text_uses_fallback_for_blank_input() {
        assert_eq!(sanitize_text("   ", 255, "Guest"), "Guest");
        assert_eq!(sanitize_text("  Bo  ", 255, "Guest"), "Bo");
    }

    #[test]
    fn sanitize_text_caps_length_by_chars() {
        assert_eq!(sanitize_text("héllo", 2, ""), "hé");
        assert_eq!(sanitize_text("", 10, ""), "");
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }
}
