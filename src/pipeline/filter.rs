use crate::config::ParserConfig;
use crate::keywords::{contains_bear_keyword, matches_any};
use crate::types::Event;
use chrono::{DateTime, Duration, Utc};

/// Keep events starting strictly after now and, when set, within the look-ahead window
pub fn filter_future_events(events: Vec<Event>, days_to_look_ahead: Option<i64>) -> Vec<Event> {
    filter_future_events_at(events, days_to_look_ahead, Utc::now())
}

/// [`filter_future_events`] against an explicit clock
pub fn filter_future_events_at(events: Vec<Event>, days_to_look_ahead: Option<i64>, now: DateTime<Utc>) -> Vec<Event> {
    let cutoff = days_to_look_ahead.map(|days| now + Duration::days(days));
    events
        .into_iter()
        .filter(|event| match event.start_date {
            Some(start) => start > now && cutoff.map_or(true, |c| start <= c),
            None => false,
        })
        .collect()
}

/// Keyword/allowlist classification of a single event
pub fn is_bear_event(event: &Event, config: &ParserConfig) -> bool {
    if config.always_bear {
        return true;
    }
    let search_text = format!(
        "{} {} {}",
        event.title,
        event.description.as_deref().unwrap_or(""),
        event.venue.as_deref().unwrap_or("")
    );
    if !config.allowlist.is_empty() && config.require_keywords && !matches_any(&search_text, &config.allowlist) {
        return false;
    }
    contains_bear_keyword(&search_text)
}

/// Keep bear events, stamping `is_bear_event` on the survivors
pub fn filter_bear_events(events: Vec<Event>, config: &ParserConfig) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| is_bear_event(event, config))
        .map(|mut event| {
            event.is_bear_event = true;
            event
        })
        .collect()
}
