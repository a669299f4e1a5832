//! Calendar-day handling.
//!
//! Due dates and activity dates are stored at day granularity. Persisted
//! data may carry dates in several legacy shapes (plain ISO days, full
//! timestamps, the `"Jan 5, 2025"` display format, or the `"No due date"`
//! sentinel), so parsing is lenient: anything unrecognised becomes `None`
//! instead of an error.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

/// A calendar day with no time-of-day or zone attached.
pub type Day = NaiveDate;

/// Canonical storage format for a [`Day`].
pub const DAY_FORMAT: &str = "%Y-%m-%d";

const NO_DUE_DATE: &str = "no due date";

const DISPLAY_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%m/%d/%Y"];

fn timestamp_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ]").expect("timestamp prefix pattern is valid")
    })
}

/// Parse a day from any of the accepted shapes.
///
/// Returns `None` for blank input, the "No due date" sentinel and anything
/// that does not describe a real calendar day.
pub fn parse_day(input: &str) -> Option<Day> {
    let s = input.trim();
    if s.is_empty() || s.eq_ignore_ascii_case(NO_DUE_DATE) {
        return None;
    }

    if let Ok(day) = NaiveDate::parse_from_str(s, DAY_FORMAT) {
        return Some(day);
    }

    // Timestamps: keep the date part, drop the time of day.
    if let Some(caps) = timestamp_prefix().captures(s) {
        return NaiveDate::parse_from_str(&caps[1], DAY_FORMAT).ok();
    }

    DISPLAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Format a day in the canonical `YYYY-MM-DD` form.
pub fn format_day(day: Day) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Signed number of whole days from `from` to `to`.
pub fn days_between(from: Day, to: Day) -> i64 {
    (to - from).num_days()
}

/// The day before `day`, saturating at the minimum representable date.
pub fn previous_day(day: Day) -> Day {
    day.pred_opt().unwrap_or(day)
}

/// First day of the week containing `day`, for a week starting on `week_start`.
pub fn start_of_week(day: Day, week_start: Weekday) -> Day {
    let offset = (7 + day.weekday().num_days_from_monday()
        - week_start.num_days_from_monday())
        % 7;
    day - Duration::days(i64::from(offset))
}

/// Serde adapter for `Option<Day>` fields that tolerates malformed input.
///
/// Use with `#[serde(default, with = "goalie_core::date::lenient")]`.
pub mod lenient {
    use super::{format_day, parse_day, Day};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DD` or `null`.
    pub fn serialize<S: Serializer>(value: &Option<Day>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(day) => serializer.serialize_str(&format_day(*day)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize through [`parse_day`]; non-string values become `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Day>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => parse_day(&s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> Day {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_day() {
        assert_eq!(parse_day("2025-01-05"), Some(day(2025, 1, 5)));
        assert_eq!(parse_day("  2024-02-29 "), Some(day(2024, 2, 29)));
    }

    #[test]
    fn test_parse_timestamp_drops_time() {
        assert_eq!(parse_day("2025-03-10T23:59:59.000Z"), Some(day(2025, 3, 10)));
        assert_eq!(parse_day("2025-03-10 08:00:00"), Some(day(2025, 3, 10)));
    }

    #[test]
    fn test_parse_display_format() {
        assert_eq!(parse_day("Jan 5, 2025"), Some(day(2025, 1, 5)));
        assert_eq!(parse_day("Dec 31, 2024"), Some(day(2024, 12, 31)));
    }

    #[test]
    fn test_parse_fails_open() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("No due date"), None);
        assert_eq!(parse_day("someday"), None);
        assert_eq!(parse_day("2025-02-30"), None);
        assert_eq!(parse_day("2025-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(day(2024, 12, 31), day(2025, 1, 1)), 1);
        assert_eq!(days_between(day(2024, 2, 28), day(2024, 3, 1)), 2);
        assert_eq!(days_between(day(2025, 1, 3), day(2025, 1, 1)), -2);
    }

    #[test]
    fn test_start_of_week() {
        // 2025-01-08 is a Wednesday.
        assert_eq!(start_of_week(day(2025, 1, 8), Weekday::Sun), day(2025, 1, 5));
        assert_eq!(start_of_week(day(2025, 1, 8), Weekday::Mon), day(2025, 1, 6));
        assert_eq!(start_of_week(day(2025, 1, 5), Weekday::Sun), day(2025, 1, 5));
        assert_eq!(start_of_week(day(2025, 1, 5), Weekday::Mon), day(2024, 12, 30));
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        #[serde(default, with = "lenient")]
        due: Option<Day>,
    }

    #[test]
    fn test_lenient_serde() {
        let h: Holder = serde_json::from_str(r#"{"due":"No due date"}"#).unwrap();
        assert_eq!(h.due, None);

        let h: Holder = serde_json::from_str(r#"{"due":42}"#).unwrap();
        assert_eq!(h.due, None);

        let h: Holder = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(h.due, None);

        let h: Holder = serde_json::from_str(r#"{"due":"Feb 1, 2025"}"#).unwrap();
        assert_eq!(h.due, Some(day(2025, 2, 1)));
        assert_eq!(serde_json::to_string(&h).unwrap(), r#"{"due":"2025-02-01"}"#);
    }
}
