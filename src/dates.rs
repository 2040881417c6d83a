//! Human date parsing shared by the HTML parsers.
//!
//! Recognised shapes: RFC 3339, ISO `YYYY-MM-DD[ HH:MM]`, US slash dates
//! `M/D[/YY[YY]]`, and month-name dates in either order, with or without a
//! weekday prefix. Times are picked up separately (`8pm`, `8:30 PM`, `20:00`)
//! and interpreted in the caller's zone. A missing year resolves to the
//! nearest year that does not put the date in the past.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MONTH_ALTERNATION: &str =
    r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2}))?)?").expect("static iso date pattern")
});

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").expect("static slash date pattern"));

static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?",
        MONTH_ALTERNATION
    ))
    .expect("static month-day pattern")
});

static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})\b\.?(?:,?\s+(\d{{4}}))?",
        MONTH_ALTERNATION
    ))
    .expect("static day-month pattern")
});

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:-|–|to|until)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b",
    )
    .expect("static time range pattern")
});

static TIME_12H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("static 12h time pattern"));

static TIME_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("static 24h time pattern"));

/// Start and optional end resolved from one piece of date text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDates {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Month number (1-12) for an English month name or abbreviation
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Nearest year in which `month`/`day` is not before the reference day
pub fn infer_year(month: u32, day: u32, reference: NaiveDate) -> Option<i32> {
    let this_year = NaiveDate::from_ymd_opt(reference.year(), month, day);
    match this_year {
        Some(date) if date >= reference => Some(reference.year()),
        _ => {
            // Feb 29 may only exist a few years out
            (1..=4)
                .map(|offset| reference.year() + offset)
                .find(|year| NaiveDate::from_ymd_opt(*year, month, day).is_some())
        }
    }
}

/// Interpret a wall-clock time in `tz`; the earlier instant wins on DST overlaps
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse an RFC 3339 timestamp, or a naive ISO timestamp in `tz`
pub fn parse_iso_datetime(text: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return localize(naive, tz);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| localize(d.and_time(NaiveTime::MIN), tz))
}

/// Calendar date found in free text, if any
pub fn extract_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(date) = MONTH_DAY.captures(text).and_then(|c| month_name_date(&c, 1, 2, 3, reference)) {
        return Some(date);
    }
    if let Some(date) = DAY_MONTH.captures(text).and_then(|c| month_name_date(&c, 2, 1, 3, reference)) {
        return Some(date);
    }
    if let Some(caps) = SLASH_DATE.captures(text) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => expand_year(y.as_str().parse().ok()?),
            None => infer_year(month, day, reference)?,
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

fn month_name_date(caps: &Captures, month_idx: usize, day_idx: usize, year_idx: usize, reference: NaiveDate) -> Option<NaiveDate> {
    let month = month_from_name(caps.get(month_idx)?.as_str())?;
    let day: u32 = caps.get(day_idx)?.as_str().parse().ok()?;
    let year = match caps.get(year_idx) {
        Some(y) => y.as_str().parse().ok()?,
        None => infer_year(month, day, reference)?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn clock(hour: u32, minute: Option<&str>, meridiem: Option<&str>) -> Option<NaiveTime> {
    let minute: u32 = minute.map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    let hour = match meridiem.map(|m| m.to_ascii_lowercase()) {
        Some(m) if m == "am" => {
            if hour > 12 {
                return None;
            }
            hour % 12
        }
        Some(_) => {
            if hour > 12 {
                return None;
            }
            hour % 12 + 12
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Start and optional end time of day found in free text
pub fn extract_times(text: &str) -> (Option<NaiveTime>, Option<NaiveTime>) {
    if let Some(caps) = TIME_RANGE.captures(text) {
        let end_meridiem = caps.get(6).map(|m| m.as_str());
        let start_meridiem = caps.get(3).map(|m| m.as_str()).or(end_meridiem);
        let start = caps[1]
            .parse()
            .ok()
            .and_then(|h| clock(h, caps.get(2).map(|m| m.as_str()), start_meridiem));
        let end = caps[4]
            .parse()
            .ok()
            .and_then(|h| clock(h, caps.get(5).map(|m| m.as_str()), end_meridiem));
        if start.is_some() {
            return (start, end);
        }
    }
    if let Some(caps) = TIME_12H.captures(text) {
        let start = caps[1]
            .parse()
            .ok()
            .and_then(|h| clock(h, caps.get(2).map(|m| m.as_str()), caps.get(3).map(|m| m.as_str())));
        return (start, None);
    }
    if let Some(caps) = TIME_24H.captures(text) {
        let start = caps[1].parse().ok().and_then(|h| clock(h, Some(&caps[2]), None));
        return (start, None);
    }
    (None, None)
}

/// Resolve free date text to absolute instants.
///
/// RFC 3339 input is taken as-is. Otherwise a calendar date is required;
/// the time defaults to midnight local, and an end time earlier than the
/// start rolls to the next day. Unparseable text yields `None`.
pub fn parse_event_dates(text: &str, reference: DateTime<Utc>, tz: Tz) -> Option<ParsedDates> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedDates {
            start: parsed.with_timezone(&Utc),
            end: None,
        });
    }

    let local_reference = reference.with_timezone(&tz).date_naive();
    let date = extract_date(trimmed, local_reference)?;

    let iso_time = ISO_DATE.captures(trimmed).and_then(|caps| {
        let hour = caps.get(4)?.as_str().parse().ok()?;
        let minute = caps.get(5)?.as_str().parse().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    });
    let (start_time, end_time) = match iso_time {
        Some(t) => (Some(t), None),
        None => extract_times(&strip_dates(trimmed)),
    };

    let start = localize(date.and_time(start_time.unwrap_or(NaiveTime::MIN)), tz)?;
    let end = end_time.and_then(|t| {
        let mut end_date = date;
        if t < start_time.unwrap_or(NaiveTime::MIN) {
            end_date += Duration::days(1);
        }
        localize(end_date.and_time(t), tz)
    });
    Some(ParsedDates { start, end })
}

// Blank out date fragments so their digits are not read as clock times
fn strip_dates(text: &str) -> String {
    let without_iso = ISO_DATE.replace_all(text, " ");
    let without_slash = SLASH_DATE.replace_all(&without_iso, " ");
    let without_month_day = MONTH_DAY.replace_all(&without_slash, " ");
    DAY_MONTH.replace_all(&without_month_day, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn start_of(text: &str, tz: Tz) -> Option<DateTime<Utc>> {
        parse_event_dates(text, reference(), tz).map(|d| d.start)
    }

    #[test]
    fn test_weekday_prefixed_month_name_with_time() {
        let parsed = parse_event_dates("Friday, September 5, 2025 at 10:00 PM", reference(), chrono_tz::UTC).unwrap();
        assert_eq!(parsed.start, Utc.with_ymd_and_hms(2025, 9, 5, 22, 0, 0).unwrap());
        assert_eq!(parsed.end, None);
    }

    #[test]
    fn test_slash_date_in_local_zone() {
        let start = start_of("9/5/2025 8pm", New_York).unwrap();
        // EDT is UTC-4
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 9, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_iso_dates() {
        let start = start_of("2025-07-04", chrono_tz::UTC).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 7, 4, 0, 0, 0).unwrap());
        let start = start_of("2025-07-04T21:30:00-04:00", chrono_tz::UTC).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 7, 5, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_year_uses_nearest_future_year() {
        let start = start_of("Sat, Mar 8", chrono_tz::UTC).unwrap();
        assert_eq!(start.year(), 2026);
        let start = start_of("Aug 2", chrono_tz::UTC).unwrap();
        assert_eq!(start.year(), 2025);
    }

    #[test]
    fn test_day_before_month_order() {
        let start = start_of("5th September 2025", chrono_tz::UTC).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 9, 5).unwrap());
    }

    #[test]
    fn test_time_range_rolls_past_midnight() {
        let parsed = parse_event_dates("Saturday, October 11, 2025 10pm - 2am", reference(), chrono_tz::UTC).unwrap();
        assert_eq!(parsed.start, Utc.with_ymd_and_hms(2025, 10, 11, 22, 0, 0).unwrap());
        assert_eq!(parsed.end, Some(Utc.with_ymd_and_hms(2025, 10, 12, 2, 0, 0).unwrap()));
    }

    #[test]
    fn test_range_inherits_meridiem() {
        let (start, end) = extract_times("9-11pm");
        assert_eq!(start, NaiveTime::from_hms_opt(21, 0, 0));
        assert_eq!(end, NaiveTime::from_hms_opt(23, 0, 0));
    }

    #[test]
    fn test_unparseable_text_is_none() {
        assert_eq!(start_of("coming soon", chrono_tz::UTC), None);
        assert_eq!(start_of("", chrono_tz::UTC), None);
        assert_eq!(start_of("13/45/2025", chrono_tz::UTC), None);
    }
}
