/// Format whole seconds as `MM:SS`, switching to `H:MM:SS` from one hour on.
pub fn format_clock(total_secs: u64) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Compact rest label: `45s` under a minute, `1:30` above.
pub fn format_rest(total_secs: u64) -> String {
    if total_secs < 60 {
        format!("{total_secs}s")
    } else {
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// Ratio as a percentage clamped to `[0, 100]`; zero when `total` is zero.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * part as f64 / total as f64).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_minutes() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3599), "59:59");
    }

    #[test]
    fn test_format_clock_hours() {
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(3723), "1:02:03");
    }

    #[test]
    fn test_format_rest() {
        assert_eq!(format_rest(45), "45s");
        assert_eq!(format_rest(60), "1:00");
        assert_eq!(format_rest(95), "1:35");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 5), 20.0);
        assert_eq!(percent(5, 5), 100.0);
        assert_eq!(percent(7, 5), 100.0);
        assert_eq!(percent(3, 0), 0.0);
    }
}
