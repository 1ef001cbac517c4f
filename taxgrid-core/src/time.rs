//! Time utilities: run timestamps in the reporting timezone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Run folders and error reports are stamped in Pacific time.
pub const REPORT_TZ: Tz = chrono_tz::America::Los_Angeles;

/// Convert a UTC instant into the reporting timezone.
pub fn to_report_tz(now: DateTime<Utc>) -> DateTime<Tz> {
    now.with_timezone(&REPORT_TZ)
}

/// `output-YYYYMMDD-HHMM` for a run started at `now`.
pub fn output_folder_name(now: DateTime<Utc>) -> String {
    format!("output-{}", to_report_tz(now).format("%Y%m%d-%H%M"))
}

/// Effective dates are written verbatim, but must be real `YYYY-MM-DD` dates.
pub fn is_valid_effective_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_folder_uses_pacific_time() {
        // January is PST (UTC-8)
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 3, 30, 0).unwrap();
        assert_eq!(output_folder_name(now), "output-20260114-1930");
    }

    #[test]
    fn test_report_tz_offset_in_summer() {
        // July is PDT (UTC-7)
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(to_report_tz(now).to_rfc3339(), "2026-07-01T05:00:00-07:00");
    }

    #[test]
    fn test_effective_date_validation() {
        assert!(is_valid_effective_date("1999-01-01"));
        assert!(is_valid_effective_date(" 2024-02-29 "));
        assert!(!is_valid_effective_date("2023-02-29"));
        assert!(!is_valid_effective_date("01/01/1999"));
    }
}
