//! Locale-independent display helpers shared by the CLI renderers.

use url::Url;

/// Format a duration given in milliseconds: `850ms`, `2.5s`, `1m 5s`
pub fn format_duration(ms: f64) -> String {
    if ms < 1000.0 {
        return format!("{}ms", ms.round() as i64);
    }

    let seconds = ms / 1000.0;
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }

    let minutes = (seconds / 60.0).floor() as i64;
    let remaining = (seconds % 60.0).round() as i64;
    format!("{}m {}s", minutes, remaining)
}

/// Format a 0-1 fraction as a whole percentage
pub fn format_percent(value: f64) -> String {
    format!("{}%", (value * 100.0).round() as i64)
}

/// Shorten text to `max_chars` characters, appending `...` when cut
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Host and path of a URL, or the input unchanged if it does not parse
pub fn display_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path()),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(850.4), "850ms");
        assert_eq!(format_duration(2500.0), "2.5s");
        assert_eq!(format_duration(65_000.0), "1m 5s");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.87), "87%");
        assert_eq!(format_percent(1.0), "100%");
    }

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefgh", 3), "abc...");
        assert_eq!(truncate_text("성능분석보고서", 2), "성능...");
    }

    #[test]
    fn test_display_url() {
        assert_eq!(display_url("https://example.com/blog?x=1"), "example.com/blog");
        assert_eq!(display_url("not a url"), "not a url");
    }
}
