//! Wire timestamps

use chrono::{Local, TimeZone};

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// Format `timestamp` as `YYYYMMDDHHMMSS` local time after shifting it by
/// `offset_minutes`.
///
/// Returns `None` when the shifted instant cannot be represented.
#[must_use]
pub fn format_timestamp(timestamp: Timestamp, offset_minutes: i32) -> Option<String> {
    let shifted = timestamp.checked_add(i64::from(offset_minutes) * 60)?;
    Local
        .timestamp_opt(shifted, 0)
        .earliest()
        .map(|local| local.format("%Y%m%d%H%M%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_local_time() {
        let ts = 1_700_000_000;
        let expected = Local
            .timestamp_opt(ts, 0)
            .unwrap()
            .format("%Y%m%d%H%M%S")
            .to_string();
        let formatted = format_timestamp(ts, 0).unwrap();
        assert_eq!(formatted, expected);
        assert_eq!(formatted.len(), 14);
        assert!(formatted.bytes().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn offset_is_applied_in_minutes() {
        let ts = 1_700_000_000;
        assert_eq!(format_timestamp(ts, 90), format_timestamp(ts + 5400, 0));
        assert_eq!(format_timestamp(ts, -60), format_timestamp(ts - 3600, 0));
    }

    #[test]
    fn unrepresentable_instants_are_rejected() {
        assert_eq!(format_timestamp(i64::MAX, 1), None);
    }
}
