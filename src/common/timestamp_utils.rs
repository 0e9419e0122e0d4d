use chrono::{DateTime, Local};

/// Filesystem-safe and lexicographically sortable, e.g. `2024-03-09T14-05-00`.
///
/// Local wall-clock time without an offset. During the repeated hour at the
/// end of daylight saving time a token recurs, so a round can overwrite the
/// file written one hour earlier.
pub const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

pub fn format_capture_timestamp(at: &DateTime<Local>) -> String {
    at.format(CAPTURE_TIMESTAMP_FORMAT).to_string()
}

// Get current local timestamp as a capture token
pub fn current_capture_timestamp() -> String {
    format_capture_timestamp(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn formats_without_path_hostile_characters() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let token = format_capture_timestamp(&at);
        assert_eq!(token, "2024-03-09T14-05-00");
        assert!(!token.contains(':') && !token.contains('/'));
    }

    #[test]
    fn later_times_sort_after_earlier_ones() {
        let first = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let second = first + Duration::seconds(1);
        let (a, b) = (format_capture_timestamp(&first), format_capture_timestamp(&second));
        assert!(a < b, "{} should sort before {}", a, b);
    }
}
