pub fn format_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}TB")
}

/// `h:mm:ss`, or `m:ss` under an hour. Missing or zero durations read `N/A`.
pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s > 0.0 => s,
        _ => return "N/A".to_string(),
    };
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Shortens long URLs for display.
pub fn preview(url: &str, max_chars: usize) -> String {
    if url.chars().count() > max_chars {
        format!("{}...", url.chars().take(max_chars).collect::<String>())
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.0B");
        assert_eq!(format_size(1023), "1023.0B");
        assert_eq!(format_size(1024), "1.0KB");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0GB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024 * 1024), "2.0TB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(0.0)), "N/A");
        assert_eq!(format_duration(Some(5.9)), "0:05");
        assert_eq!(format_duration(Some(125.4)), "2:05");
        assert_eq!(format_duration(Some(3600.0)), "1:00:00");
        assert_eq!(format_duration(Some(3725.0)), "1:02:05");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 80), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
