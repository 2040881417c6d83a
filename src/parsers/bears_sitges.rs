//! Bears Sitges Week programme page.
//!
//! The page is one long list of day headings (`VIERNES - 05`, `SÁBADO - 06`)
//! each followed by paragraphs such as `22h a 03h WELCOME PARTY en «Bar»` or
//! `20h. INAUGURACIÓN`. Day headings never carry a month, so the month is
//! recovered from the weekday: the month in the festival year whose
//! day-of-month falls on the named weekday.

use super::html::clean_fragment_text;
use super::EventParser;
use crate::config::ParserConfig;
use crate::constants::{BEARS_SITGES_SOURCE, DEFAULT_SITGES_MAX_DAYS, SINGLE_HOUR_EVENT_HOURS};
use crate::dates::localize;
use crate::pipeline::dedup::normalize_title_for_key;
use crate::types::{non_empty, Event, HtmlPage, ParseResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, info};

static DAY_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(VIERNES|S[ÁA](?:<[^>]*>)*BADO|DOMINGO|LUNES|MARTES|MI[ÉE](?:<[^>]*>)*RCOLES|JUEVES)\s*-\s*(\d{1,2})\b",
    )
    .expect("static day label pattern")
});
static FESTIVAL_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)BEARS\s+SITGES\s+WEEK\s+(\d{4})").expect("static festival year pattern"));
static ANY_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("static year pattern"));
static MONTH_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)del\s+\d{1,2}\s+al\s+\d{1,2}\s+de\s+([a-z]+)").expect("static month range pattern")
});
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("static paragraph pattern"));
static HOUR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\s*h\s+(?:a|to|-)\s+(\d{1,2})\s*h\.?\s+(.+)$").expect("static hour range pattern")
});
static SINGLE_HOUR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})\s*h\s*[.:]\s*(.+)$").expect("static single hour pattern"));
static QUOTED_VENUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"«([^»]+)»").expect("static quoted venue pattern"));
// "by X" stops at a price marker, a quoted venue or the end of the sentence
static BY_VENUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bby\s+([^*.«]+?)\s*(?:\*\*|Entrada|«|\.|$)").expect("static by-venue pattern")
});
static STARRED_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("static starred price pattern"));
static ENTRADA_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(Entrada[^.]*\.?)").expect("static entrada pattern"));

const SPANISH_MONTHS: &[&str] = &[
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Weekday for a Spanish (or English) day name; accents optional, HTML-split names tolerated
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    let upper = clean_fragment_text(name).to_uppercase().replace(' ', "");
    let weekday = match upper.as_str() {
        "LUNES" | "MONDAY" => Weekday::Mon,
        "MARTES" | "TUESDAY" => Weekday::Tue,
        "JUEVES" | "THURSDAY" => Weekday::Thu,
        "VIERNES" | "FRIDAY" => Weekday::Fri,
        "DOMINGO" | "SUNDAY" => Weekday::Sun,
        "SATURDAY" => Weekday::Sat,
        "WEDNESDAY" => Weekday::Wed,
        other if other.contains("RCOLES") => Weekday::Wed,
        other if other.contains("BADO") => Weekday::Sat,
        _ => return None,
    };
    Some(weekday)
}

/// Zero-based month in `year` whose `day` falls on `weekday`, searching from January.
///
/// `determine_month_from_day_of_week(2025, 5, "VIERNES") == Some(8)`: 5 September 2025 is a Friday.
pub fn determine_month_from_day_of_week(year: i32, day: u32, weekday: &str) -> Option<u32> {
    let target = weekday_from_name(weekday)?;
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| date.weekday() == target)
        .map(|date| date.month0())
}

/// Festival year: the `BEARS SITGES WEEK YYYY` banner, else the latest year mentioned, else next year
pub fn extract_festival_year(html: &str, now: DateTime<Utc>) -> i32 {
    if let Some(year) = FESTIVAL_YEAR.captures(html).and_then(|caps| caps[1].parse().ok()) {
        return year;
    }
    ANY_YEAR
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .max()
        .unwrap_or(now.year() + 1)
}

// One-based month named in a "del 5 al 14 de septiembre" banner
fn month_hint(html: &str) -> Option<u32> {
    let name = MONTH_RANGE.captures(html)?.get(1)?.as_str().to_lowercase();
    SPANISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
        .or_else(|| crate::dates::month_from_name(&name))
}

fn resolve_date(year: i32, day: u32, weekday_name: &str, hint: Option<u32>) -> Option<NaiveDate> {
    let target = weekday_from_name(weekday_name)?;
    // The banner month first, then its neighbours for festivals that straddle a month end
    if let Some(hint) = hint {
        for month in [hint, hint + 1, hint.saturating_sub(1)] {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day).filter(|d| d.weekday() == target) {
                return Some(date);
            }
        }
    }
    let month0 = determine_month_from_day_of_week(year, day, weekday_name)?;
    NaiveDate::from_ymd_opt(year, month0 + 1, day)
}

/// One day heading and the slice of HTML it governs
#[derive(Debug)]
struct DaySection {
    date: NaiveDate,
    spans: Vec<Range<usize>>,
}

fn split_day_sections(html: &str, year: i32, hint: Option<u32>) -> Vec<DaySection> {
    let labels: Vec<_> = DAY_LABEL.captures_iter(html).collect();
    let mut sections: Vec<DaySection> = Vec::new();

    for (idx, caps) in labels.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = labels
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let Some(day) = caps[2].parse::<u32>().ok() else {
            continue;
        };
        let Some(date) = resolve_date(year, day, &caps[1], hint) else {
            debug!("Bears Sitges: no date for day label '{}'", whole.as_str());
            continue;
        };
        let span = whole.end()..end;
        match sections.iter_mut().find(|s| s.date == date) {
            Some(section) => section.spans.push(span),
            None => sections.push(DaySection {
                date,
                spans: vec![span],
            }),
        }
    }
    sections
}

fn hour(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|h| *h < 24)
}

/// Title up to the first full stop or venue marker; description is what follows
fn split_title(text: &str) -> (String, Option<String>) {
    let title_end = [text.find('.'), text.find(" en «"), text.find('«')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    let title = text[..title_end].trim().trim_end_matches(|c: char| c == ',' || c == ':').trim();
    let rest = text[title_end..].trim_start_matches('.').trim();
    let title = if title.is_empty() { text.trim() } else { title };
    (title.to_string(), non_empty(rest))
}

fn extract_venue(text: &str) -> Option<String> {
    QUOTED_VENUE
        .captures(text)
        .or_else(|| BY_VENUE.captures(text))
        .and_then(|caps| non_empty(caps[1].trim()))
}

fn extract_price(text: &str) -> Option<String> {
    STARRED_PRICE
        .captures(text)
        .or_else(|| ENTRADA_PRICE.captures(text))
        .and_then(|caps| non_empty(caps[1].trim()))
}

/// Bears Sitges Week festival programme
pub struct BearsSitgesParser;

impl BearsSitgesParser {
    fn parse_entry(&self, text: &str, date: NaiveDate, page: &HtmlPage, tz: Tz) -> Option<Event> {
        let (start, end, body) = if let Some(caps) = HOUR_RANGE.captures(text) {
            let start_hour = hour(&caps[1])?;
            let end_hour = hour(&caps[2])?;
            let start = date.and_time(NaiveTime::from_hms_opt(start_hour, 0, 0)?);
            let end_date = if end_hour < start_hour { date.succ_opt()? } else { date };
            let end = end_date.and_time(NaiveTime::from_hms_opt(end_hour, 59, 59)?);
            (start, end, caps.get(3)?.as_str())
        } else if let Some(caps) = SINGLE_HOUR.captures(text) {
            let start = date.and_time(NaiveTime::from_hms_opt(hour(&caps[1])?, 0, 0)?);
            (start, start + Duration::hours(SINGLE_HOUR_EVENT_HOURS), caps.get(2)?.as_str())
        } else {
            // untimed entries run the whole day
            let start = date.and_time(NaiveTime::MIN);
            (start, date.and_time(NaiveTime::from_hms_opt(23, 59, 0)?), text)
        };

        let (title, description) = split_title(body.trim());
        if title.is_empty() {
            return None;
        }

        let mut event = Event::new(title, self.name());
        event.start_date = localize(start, tz);
        event.end_date = localize(end, tz);
        event.description = description;
        event.venue = extract_venue(body);
        event.price = extract_price(body);
        event.city = Some("sitges".to_string());
        event.url = Some(page.url.clone());
        event.is_bear_event = true;
        Some(event)
    }

    fn parse_section(&self, html: &str, section: &DaySection, page: &HtmlPage, tz: Tz) -> Vec<Event> {
        section
            .spans
            .iter()
            .flat_map(|span| PARAGRAPH.captures_iter(&html[span.clone()]))
            .filter_map(|caps| {
                let text = clean_fragment_text(caps.get(1)?.as_str());
                if text.chars().filter(|c| c.is_alphabetic()).count() < 3 || DAY_LABEL.is_match(&text) {
                    return None;
                }
                let event = self.parse_entry(&text, section.date, page, tz);
                if event.is_none() {
                    debug!("Bears Sitges: skipped entry '{}'", text);
                }
                event
            })
            .collect()
    }
}

fn dedupe_by_title_and_times(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| {
            seen.insert((
                normalize_title_for_key(&event.title),
                event.start_date.map(|d| d.to_rfc3339()),
                event.end_date.map(|d| d.to_rfc3339()),
            ))
        })
        .collect()
}

impl EventParser for BearsSitgesParser {
    fn name(&self) -> &'static str {
        BEARS_SITGES_SOURCE
    }

    fn parse_events(&self, page: &HtmlPage, config: &ParserConfig) -> ParseResult {
        let mut result = ParseResult::empty(self.name(), &page.url);
        if page.html.trim().is_empty() {
            return result;
        }

        let tz = config.timezone_or(chrono_tz::Europe::Madrid);
        let year = extract_festival_year(&page.html, Utc::now());
        let sections = split_day_sections(&page.html, year, month_hint(&page.html));
        if sections.is_empty() {
            info!("🐻 Bears Sitges: no day headings found on {}", page.url);
            return result;
        }

        let max_days = config.max_days.unwrap_or(DEFAULT_SITGES_MAX_DAYS);
        let events = sections
            .iter()
            .take(max_days)
            .flat_map(|section| self.parse_section(&page.html, section, page, tz))
            .collect();
        result.events = dedupe_by_title_and_times(events);

        info!(
            "🐻 Bears Sitges: found {} events across {} days of {}",
            result.events.len(),
            sections.len().min(max_days),
            year
        );
        result
    }
}
