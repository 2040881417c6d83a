use super::merge::merge_events;
use crate::types::Event;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

static PUNCTUATION_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\s><\-.,!@#$%^&*()_+={}\[\]|\\:;"'?/]+"#).expect("static punctuation run pattern"));

static TRAILING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\p{L})[!@#$%^&*()_+={}\[\]|\\:;"'?,.]+(\s|$)"#).expect("static trailing punctuation pattern")
});

static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").expect("static separator pattern"));

// Punctuation or whitespace runs sitting between two letters become a single hyphen
fn fold_inner_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for run in PUNCTUATION_RUN.find_iter(text) {
        let before = text[..run.start()].chars().next_back();
        let after = text[run.end()..].chars().next();
        out.push_str(&text[last..run.start()]);
        if before.is_some_and(char::is_alphabetic) && after.is_some_and(char::is_alphabetic) {
            out.push('-');
        } else {
            out.push_str(run.as_str());
        }
        last = run.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Lowercased title with punctuation variants folded, e.g. `D>U>R>O!` -> `d-u-r-o`
pub fn normalize_title_for_key(title: &str) -> String {
    let folded = fold_inner_punctuation(&title.trim().to_lowercase());
    let trimmed = TRAILING_PUNCTUATION.replace_all(&folded, "$1$2");
    let collapsed = SEPARATOR_RUNS.replace_all(&trimmed, "-");
    collapsed.trim_matches('-').to_string()
}

/// Identity key: `normalized title|YYYY-MM-DD|lowercase venue`, date taken in UTC
pub fn create_event_key(event: &Event) -> String {
    let date = event
        .start_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let venue = event.venue.as_deref().unwrap_or("").trim().to_lowercase();
    format!("{}|{}|{}", normalize_title_for_key(&event.title), date, venue)
}

/// Collapse events sharing an identity key; later occurrences merge into the first
pub fn deduplicate_events(events: Vec<Event>) -> Vec<Event> {
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut deduplicated: Vec<Event> = Vec::with_capacity(events.len());

    for mut event in events {
        let key = create_event_key(&event);
        event.key = Some(key.clone());

        match index_by_key.get(&key) {
            Some(&idx) => {
                debug!("Merging duplicate event with key {}", key);
                let mut merged = merge_events(&deduplicated[idx], &event);
                merged.key = Some(key);
                deduplicated[idx] = merged;
            }
            None => {
                index_by_key.insert(key, deduplicated.len());
                deduplicated.push(event);
            }
        }
    }

    deduplicated
}
