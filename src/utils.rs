/// Truncate to at most `max_chars` characters, never splitting a
/// multi-byte character. Used to keep operator queries short in logs.
#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Like [`safe_truncate`] but appends `...` when anything was cut.
#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_query() {
        assert_eq!(
            safe_truncate("show admin password for prod-web-01", 10),
            "show admin"
        );
    }

    #[test]
    fn test_truncate_short_query() {
        assert_eq!(safe_truncate("vpn", 10), "vpn");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(safe_truncate("Zürich öffice", 6), "Zürich");
    }

    #[test]
    fn test_truncate_ellipsis() {
        assert_eq!(safe_truncate_ellipsis("backup status report", 6), "backup...");
        assert_eq!(safe_truncate_ellipsis("dns", 10), "dns");
    }
}
