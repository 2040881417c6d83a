use super::merge::{merge_events_with_diff, MergeDiff};
use super::notes::{apply_note_fields, format_event_notes, parse_notes_into_fields};
use crate::city::parse_coordinates;
use crate::types::{Event, EventAction, EventOriginal, StoredCalendarEvent, FIELD_KEY, FIELD_VENUE};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// What to do with a candidate given the events already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    New,
    Merge,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAnalysis {
    pub decision: Decision,
    pub reason: &'static str,
    /// Index into the stored slice of the event to merge into
    pub existing: Option<usize>,
    /// Indices of overlapping, unrelated stored events
    pub conflicts: Vec<usize>,
}

impl EventAnalysis {
    fn new(reason: &'static str) -> Self {
        Self {
            decision: Decision::New,
            reason,
            existing: None,
            conflicts: Vec::new(),
        }
    }

    fn merge(reason: &'static str, index: usize) -> Self {
        Self {
            decision: Decision::Merge,
            reason,
            existing: Some(index),
            conflicts: Vec::new(),
        }
    }
}

/// Event to write plus how it was derived
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub event: Event,
    pub analysis: EventAnalysis,
    pub diff: MergeDiff,
}

fn normalize_for_similarity(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Fuzzy title match: equal or contained after stripping punctuation, or same lead name before `:`/`-`
pub fn are_titles_similar(a: &str, b: &str) -> bool {
    let norm_a = normalize_for_similarity(a);
    let norm_b = normalize_for_similarity(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return false;
    }
    if norm_a == norm_b || norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return true;
    }
    let lead = |title: &str| {
        let head = title
            .split(|c: char| matches!(c, ':' | '-' | '–' | '—'))
            .next()
            .unwrap_or(title);
        normalize_for_similarity(head)
    };
    let lead_a = lead(a);
    !lead_a.is_empty() && lead_a == lead(b)
}

/// Instants within `tolerance_minutes` of each other
pub fn are_dates_equal(a: DateTime<Utc>, b: DateTime<Utc>, tolerance_minutes: i64) -> bool {
    (a - b).abs() <= Duration::minutes(tolerance_minutes)
}

/// Half-open ranges `[start1, end1)` and `[start2, end2)` intersect
pub fn do_dates_overlap(start1: DateTime<Utc>, end1: DateTime<Utc>, start2: DateTime<Utc>, end2: DateTime<Utc>) -> bool {
    start1 < end2 && end1 > start2
}

/// Rebuild a full event from a stored calendar entry
pub fn stored_to_event(stored: &StoredCalendarEvent) -> Event {
    let mut event = Event::new(stored.title.clone(), "");
    apply_note_fields(&mut event, &parse_notes_into_fields(&stored.notes));
    event.title = stored.title.clone();
    event.start_date = Some(stored.start_date);
    event.end_date = Some(stored.end_date);
    event.url = stored.url.clone().or(event.url);
    event.city = stored.city.clone().or(event.city);
    if let Some(location) = stored.location.as_deref().filter(|l| !l.trim().is_empty()) {
        if parse_coordinates(location).is_some() {
            event.coordinates = Some(location.to_string());
        } else {
            event.address = Some(location.to_string());
        }
    }
    event
}

/// Flatten an event into a calendar entry; undated events cannot be stored
pub fn event_to_stored(event: &Event, id: String) -> Option<StoredCalendarEvent> {
    let start = event.start_date?;
    Some(StoredCalendarEvent {
        id,
        title: event.title.clone(),
        start_date: start,
        end_date: event.end_date.filter(|end| *end >= start).unwrap_or(start),
        location: event.address.clone().or_else(|| event.coordinates.clone()),
        notes: format_event_notes(event),
        url: event.url.clone(),
        city: event.city.clone(),
    })
}

fn stored_venue(stored: &StoredCalendarEvent) -> Option<String> {
    parse_notes_into_fields(&stored.notes)
        .remove(FIELD_VENUE)
        .or_else(|| stored.location.clone())
}

/// Decide whether `candidate` is new, an update of a stored event, or clashes with one
pub fn analyze_event_action(candidate: &Event, stored: &[StoredCalendarEvent]) -> EventAnalysis {
    if stored.is_empty() {
        return EventAnalysis::new("No existing events found");
    }

    if let Some(key) = candidate.key.as_deref() {
        let key_match = stored
            .iter()
            .position(|s| parse_notes_into_fields(&s.notes).get(FIELD_KEY).map(String::as_str) == Some(key));
        if let Some(index) = key_match {
            return EventAnalysis::merge("Key match found", index);
        }
    }

    let Some(start) = candidate.start_date else {
        return EventAnalysis::new("Candidate has no start date");
    };
    let end = candidate.end_date.unwrap_or(start);

    if let Some(index) = stored
        .iter()
        .position(|s| are_titles_similar(&s.title, &candidate.title) && are_dates_equal(s.start_date, start, 1))
    {
        return EventAnalysis::merge("Similar event found", index);
    }

    let overlapping: Vec<usize> = stored
        .iter()
        .enumerate()
        .filter(|(_, s)| do_dates_overlap(s.start_date, s.end_date, start, end))
        .map(|(i, _)| i)
        .collect();
    if overlapping.is_empty() {
        return EventAnalysis::new("No conflicts found");
    }

    let candidate_venue = candidate.venue.as_deref().map(|v| v.trim().to_lowercase());
    let mergeable = overlapping.iter().copied().find(|&i| {
        let s = &stored[i];
        let same_venue = candidate_venue.is_some()
            && stored_venue(s).map(|v| v.trim().to_lowercase()) == candidate_venue
            && are_dates_equal(s.start_date, start, 60);
        are_titles_similar(&s.title, &candidate.title) || same_venue
    });
    match mergeable {
        Some(index) => EventAnalysis::merge("Mergeable time conflict", index),
        None => EventAnalysis {
            decision: Decision::Conflict,
            reason: "Time conflict detected",
            existing: None,
            conflicts: overlapping,
        },
    }
}

/// Produce the event to write for `candidate`.
///
/// New and conflicting candidates are written as new entries tagged
/// `_action = new`; matches are merged into the stored entry under the
/// candidate's strategies, tagged `_action = merge`, with both sides kept in
/// `_original`.
pub fn reconcile(candidate: &Event, stored: &[StoredCalendarEvent]) -> Reconciled {
    let analysis = analyze_event_action(candidate, stored);

    match (analysis.decision, analysis.existing) {
        (Decision::Merge, Some(index)) => {
            let existing = stored_to_event(&stored[index]);
            let mut incoming = candidate.clone();
            incoming.action = None;
            let (mut merged, diff) = merge_events_with_diff(&existing, &incoming);
            merged.action = Some(EventAction::Merge);
            merged.original = Some(Box::new(EventOriginal {
                new: candidate.without_diagnostics(),
                existing,
            }));
            debug!("Merging \"{}\" into stored entry {} ({})", candidate.title, stored[index].id, analysis.reason);
            Reconciled {
                event: merged,
                analysis,
                diff,
            }
        }
        _ => {
            if analysis.decision == Decision::Conflict {
                warn!(
                    "\"{}\" overlaps {} unrelated stored event(s); adding as new",
                    candidate.title,
                    analysis.conflicts.len()
                );
            }
            let mut event = candidate.clone();
            event.action = Some(EventAction::New);
            Reconciled {
                event,
                analysis,
                diff: MergeDiff::default(),
            }
        }
    }
}
