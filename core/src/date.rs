//! Free-form date parsing into Unix timestamps.
//!
//! The API stores every date as integer seconds. Setters accept the loose
//! textual forms people actually type ("tomorrow", "2024-03-01 12:00",
//! "01.03.2024", "+2 days") and convert them here. Input that matches none
//! of the forms becomes `0` and is logged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::clock::Clock;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

/// `If-Modified-Since` layout expected by the v2 API.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Parse `input` relative to `now`. Naive dates and times are read as UTC.
pub fn parse_timestamp(input: &str, now: DateTime<Utc>) -> Option<i64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let lower = input.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Some(now.timestamp()),
        "today" | "midnight" => return midnight(now, 0),
        "tomorrow" => return midnight(now, 1),
        "yesterday" => return midnight(now, -1),
        _ => {}
    }

    if let Some(epoch) = lower.strip_prefix('@') {
        return epoch.trim().parse().ok();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.timestamp());
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }

    relative(&lower).and_then(|offset| now.timestamp().checked_add(offset))
}

/// Like [`parse_timestamp`], but unparseable input yields `0`.
pub fn timestamp_or_zero(input: &str, clock: &dyn Clock) -> i64 {
    match parse_timestamp(input, clock.now()) {
        Some(ts) => ts,
        None => {
            warn!(input, "unparseable date, storing 0");
            0
        }
    }
}

/// Render a timestamp for the `If-Modified-Since` header.
pub fn http_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format(HTTP_DATE_FORMAT)
        .to_string()
}

fn midnight(now: DateTime<Utc>, day_offset: i64) -> Option<i64> {
    let start = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc().timestamp();
    start.checked_add(day_offset.checked_mul(86_400)?)
}

/// Offset in seconds for "+N unit", "-N unit", "N unit" and "N unit ago".
fn relative(input: &str) -> Option<i64> {
    let mut words = input.split_whitespace();
    let amount = words.next()?;
    let unit = words.next()?;
    let ago = match words.next() {
        None => false,
        Some("ago") => true,
        Some(_) => return None,
    };
    if words.next().is_some() {
        return None;
    }

    let amount: i64 = amount.strip_prefix('+').unwrap_or(amount).parse().ok()?;
    let unit_secs = match unit.trim_end_matches('s') {
        "sec" | "second" => 1,
        "min" | "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        _ => return None,
    };
    let offset = amount.checked_mul(unit_secs)?;
    if ago {
        offset.checked_neg()
    } else {
        Some(offset)
    }
}

/// Anything a date setter accepts.
pub trait IntoTimestamp {
    fn into_timestamp(self, clock: &dyn Clock) -> i64;
}

impl IntoTimestamp for &str {
    fn into_timestamp(self, clock: &dyn Clock) -> i64 {
        timestamp_or_zero(self, clock)
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self, clock: &dyn Clock) -> i64 {
        timestamp_or_zero(&self, clock)
    }
}

impl IntoTimestamp for &String {
    fn into_timestamp(self, clock: &dyn Clock) -> i64 {
        timestamp_or_zero(self, clock)
    }
}

impl IntoTimestamp for i64 {
    fn into_timestamp(self, _clock: &dyn Clock) -> i64 {
        self
    }
}

impl<Tz: TimeZone> IntoTimestamp for DateTime<Tz> {
    fn into_timestamp(self, _clock: &dyn Clock) -> i64 {
        self.timestamp()
    }
}

impl IntoTimestamp for NaiveDateTime {
    fn into_timestamp(self, _clock: &dyn Clock) -> i64 {
        self.and_utc().timestamp()
    }
}

impl IntoTimestamp for NaiveDate {
    fn into_timestamp(self, _clock: &dyn Clock) -> i64 {
        self.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    // 2024-03-01 10:30:00 UTC
    const NOW: i64 = 1_709_289_000;

    fn parse(input: &str) -> Option<i64> {
        parse_timestamp(input, FixedClock::at(NOW).0)
    }

    #[test]
    fn keywords_resolve_against_clock() {
        assert_eq!(parse("now"), Some(NOW));
        assert_eq!(parse("NOW"), Some(NOW));
        assert_eq!(parse("today"), Some(1_709_251_200));
        assert_eq!(parse("tomorrow"), Some(1_709_251_200 + 86_400));
        assert_eq!(parse("yesterday"), Some(1_709_251_200 - 86_400));
    }

    #[test]
    fn absolute_formats() {
        assert_eq!(parse("2024-03-01"), Some(1_709_251_200));
        assert_eq!(parse("2024-03-01 10:30:00"), Some(NOW));
        assert_eq!(parse("2024-03-01 10:30"), Some(NOW));
        assert_eq!(parse("2024-03-01T10:30:00"), Some(NOW));
        assert_eq!(parse("01.03.2024"), Some(1_709_251_200));
        assert_eq!(parse("01.03.2024 10:30"), Some(NOW));
        assert_eq!(parse("03/01/2024"), Some(1_709_251_200));
        assert_eq!(parse("2024-03-01T13:30:00+03:00"), Some(NOW));
        assert_eq!(parse("Fri, 01 Mar 2024 10:30:00 +0000"), Some(NOW));
        assert_eq!(parse("@1709289000"), Some(NOW));
    }

    #[test]
    fn relative_offsets() {
        assert_eq!(parse("+1 day"), Some(NOW + 86_400));
        assert_eq!(parse("-2 hours"), Some(NOW - 7_200));
        assert_eq!(parse("3 weeks"), Some(NOW + 3 * 604_800));
        assert_eq!(parse("10 min ago"), Some(NOW - 600));
        assert_eq!(parse("+30 seconds"), Some(NOW + 30));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("next blue moon"), None);
        assert_eq!(parse("2024-13-45"), None);
        assert_eq!(parse("+1 fortnight"), None);
        assert_eq!(parse("1 day later"), None);
        assert_eq!(parse("-9223372036854775808 sec ago"), None);
        assert_eq!(parse("9223372036854775807 weeks"), None);
    }

    #[test]
    fn unparseable_input_becomes_zero() {
        assert_eq!(timestamp_or_zero("not a date", &FixedClock::at(NOW)), 0);
        assert_eq!(timestamp_or_zero("-9223372036854775808 sec ago", &FixedClock::at(0)), 0);
    }

    #[test]
    fn http_date_layout() {
        assert_eq!(http_date(NOW), "Fri, 01 Mar 2024 10:30:00");
    }

    #[test]
    fn typed_inputs_pass_through() {
        let clock = FixedClock::at(NOW);
        assert_eq!(42_i64.into_timestamp(&clock), 42);
        assert_eq!(clock.0.into_timestamp(&clock), NOW);
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(date.into_timestamp(&clock), 1_709_251_200);
    }
}
