//! Turning command-line text into dates, durations and attachment URLs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use caledit_core::EventTime;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date or date/time. ISO forms are tried first, then natural
/// language ("friday 3pm"). Input without a time of day gives an all-day date.
pub fn parse_datetime(input: &str) -> Result<EventTime> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(EventTime::Date(date));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(EventTime::DateTimeFloating(dt));
        }
    }

    let dt = fuzzydate::parse(input)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;
    if mentions_time(input) {
        Ok(EventTime::DateTimeFloating(dt))
    } else {
        Ok(EventTime::Date(dt.date()))
    }
}

/// Whether natural-language input names a time of day.
fn mentions_time(input: &str) -> bool {
    let lower = input.to_lowercase();
    if lower.contains("noon") || lower.contains("midnight") || lower.contains(':') {
        return true;
    }

    lower.split_whitespace().enumerate().any(|(i, word)| {
        let meridiem = word.ends_with("am") || word.ends_with("pm");
        let digits = word.trim_end_matches("am").trim_end_matches("pm");
        if meridiem && !digits.is_empty() {
            return digits.chars().all(|c| c.is_ascii_digit());
        }
        // "3 pm"
        meridiem
            && digits.is_empty()
            && i > 0
            && lower
                .split_whitespace()
                .nth(i - 1)
                .is_some_and(|prev| prev.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Parse an end: a duration from `start` ("45m") or a date/time
/// ("until 5pm").
pub fn parse_end(input: &str, start: &EventTime) -> Result<EventTime> {
    if let Ok(end) = try_apply_duration(start, input) {
        return Ok(end);
    }

    let cleaned = input
        .strip_prefix("until ")
        .or_else(|| input.strip_prefix("to "))
        .unwrap_or(input);
    parse_datetime(cleaned)
}

pub fn apply_duration(start: &EventTime, input: &str) -> Result<EventTime> {
    try_apply_duration(start, input)
        .with_context(|| format!("Could not parse duration: \"{}\"", input))
}

fn try_apply_duration(start: &EventTime, input: &str) -> Result<EventTime> {
    let std_duration = humantime::parse_duration(input.trim())?;
    let duration = Duration::from_std(std_duration).context("Duration too large")?;
    Ok(shift(start, duration))
}

/// One hour after a timed start, one day after an all-day start.
pub fn default_end(start: &EventTime) -> EventTime {
    if start.is_date() {
        shift(start, Duration::days(1))
    } else {
        shift(start, Duration::hours(1))
    }
}

fn shift(time: &EventTime, by: Duration) -> EventTime {
    match time {
        EventTime::Date(d) => EventTime::Date(*d + by),
        EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(*dt + by),
        EventTime::DateTimeFloating(dt) => EventTime::DateTimeFloating(*dt + by),
        EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
            datetime: *datetime + by,
            tzid: tzid.clone(),
        },
    }
}

/// `file://` URL for a local file, which must exist.
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("Cannot attach {}", path.display()))?;
    let url = url::Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("Cannot attach {}", absolute.display()))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn at(h: u32, m: u32) -> EventTime {
        EventTime::DateTimeFloating(
            NaiveDate::from_ymd_opt(2026, 3, 20)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    #[test]
    fn iso_date_is_all_day() {
        assert_eq!(
            parse_datetime("2026-03-20").unwrap(),
            EventTime::Date(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap())
        );
    }

    #[test]
    fn iso_datetime_is_floating() {
        assert_eq!(parse_datetime("2026-03-20 15:00").unwrap(), at(15, 0));
        assert_eq!(parse_datetime("2026-03-20T09:30").unwrap(), at(9, 30));
    }

    #[test]
    fn natural_language_with_time_is_timed() {
        let result = parse_datetime("tomorrow 3pm").unwrap();
        assert!(matches!(result, EventTime::DateTimeFloating(_)));
    }

    #[test]
    fn gibberish_is_rejected() {
        assert!(parse_datetime("not a date at all xyz").is_err());
    }

    #[test]
    fn time_mentions() {
        assert!(mentions_time("friday 11am"));
        assert!(mentions_time("sat 3 pm"));
        assert!(mentions_time("tomorrow noon"));
        assert!(mentions_time("march 20 9:30"));
        assert!(!mentions_time("next friday"));
        assert!(!mentions_time("december"));
        assert!(!mentions_time("camp"));
    }

    #[test]
    fn end_as_duration() {
        assert_eq!(parse_end("45m", &at(15, 0)).unwrap(), at(15, 45));
        assert_eq!(apply_duration(&at(14, 0), "2h").unwrap(), at(16, 0));
    }

    #[test]
    fn end_as_datetime() {
        assert_eq!(parse_end("until 2026-03-20 17:00", &at(15, 0)).unwrap(), at(17, 0));
    }

    #[test]
    fn bad_duration_names_input() {
        let err = apply_duration(&at(14, 0), "forever").unwrap_err();
        assert!(err.to_string().contains("forever"));
    }

    #[test]
    fn default_end_follows_start_kind() {
        assert_eq!(default_end(&at(15, 0)), at(16, 0));
        let day = EventTime::Date(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
        assert_eq!(
            default_end(&day),
            EventTime::Date(NaiveDate::from_ymd_opt(2026, 3, 21).unwrap())
        );
    }

    #[test]
    fn attachments_become_file_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agenda").unwrap();

        let url = file_url(file.path()).unwrap();
        assert!(url.starts_with("file:///"));

        assert!(file_url(Path::new("/nonexistent/agenda.txt")).is_err());
    }
}
