use crate::types::{is_blank, Event, EventAction, MergeStrategy, FIELD_KEY, FIELD_SOURCE, FIELD_TITLE};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Fields reconciled outside the per-field strategy loop
const UNMERGED_FIELDS: &[&str] = &[FIELD_SOURCE, FIELD_KEY];

/// What a merge did to each field of the stored event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeDiff {
    /// Stored value kept although the candidate offered a different one
    pub preserved: Vec<String>,
    /// Previously empty, now filled from the candidate
    pub added: Vec<String>,
    /// Stored value replaced or cleared by the candidate
    pub updated: Vec<String>,
}

impl MergeDiff {
    pub fn is_empty(&self) -> bool {
        self.preserved.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }
}

/// Resolve one field value under `strategy`
pub fn resolve(strategy: MergeStrategy, existing: Option<String>, incoming: Option<String>) -> Option<String> {
    match strategy {
        MergeStrategy::Clobber => incoming,
        MergeStrategy::Preserve | MergeStrategy::Upsert => {
            if is_blank(existing.as_deref()) {
                incoming
            } else {
                existing
            }
        }
    }
}

/// Reconcile a stored event with a fresh candidate for the same real-world event.
///
/// Strategies come from the candidate's `_fieldMergeStrategies` (upsert when
/// absent). A candidate tagged `_action = new` replaces the stored record
/// verbatim. The stored `source` and `key` survive, bear classification is
/// sticky, and the candidate's strategy map is carried forward so a repeated
/// merge of the same candidate changes nothing.
pub fn merge_events(existing: &Event, incoming: &Event) -> Event {
    merge_events_with_diff(existing, incoming).0
}

/// [`merge_events`] plus a per-field account of what changed
pub fn merge_events_with_diff(existing: &Event, incoming: &Event) -> (Event, MergeDiff) {
    if incoming.action == Some(EventAction::New) {
        return (incoming.clone(), MergeDiff::default());
    }

    let mut merged = existing.clone();
    let mut diff = MergeDiff::default();

    let fields: BTreeSet<String> = existing
        .field_names()
        .into_iter()
        .chain(incoming.field_names())
        .filter(|f| !UNMERGED_FIELDS.contains(&f.as_str()))
        .collect();

    for field in fields {
        let strategy = incoming.strategy_for(&field);
        let old = existing.field(&field);
        let new = incoming.field(&field);
        let mut resolved = resolve(strategy, old.clone(), new.clone());

        // An event cannot lose its title
        if field == FIELD_TITLE && resolved.is_none() {
            resolved = old.clone();
        }

        match (&old, &resolved) {
            (None, Some(_)) => diff.added.push(field.clone()),
            (Some(o), r) if r.as_ref() != Some(o) => diff.updated.push(field.clone()),
            (Some(o), Some(_)) if new.as_ref().is_some_and(|n| n != o) => diff.preserved.push(field.clone()),
            _ => {}
        }

        merged.set_field(&field, resolved);
    }

    merged.is_bear_event = existing.is_bear_event || incoming.is_bear_event;
    merged.field_merge_strategies = incoming.field_merge_strategies.clone();
    merged.action = Some(EventAction::Merge);

    debug!(
        "Merged \"{}\": {} added, {} updated, {} preserved",
        merged.title,
        diff.added.len(),
        diff.updated.len(),
        diff.preserved.len()
    );
    (merged, diff)
}
