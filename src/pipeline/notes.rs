//! `key: value` notes blocks used to carry structured fields through a calendar store.
//!
//! Historical sources wrote the same slot under several names (`bar`, `tea`,
//! `cover`, ...). Aliases are folded onto one canonical field name when notes
//! are read, and only canonical names are ever written back.

use crate::types::{
    Event, FIELD_ADDRESS, FIELD_CITY, FIELD_COORDINATES, FIELD_DESCRIPTION, FIELD_END_DATE, FIELD_GMAPS, FIELD_IMAGE,
    FIELD_KEY, FIELD_PRICE, FIELD_SOURCE, FIELD_START_DATE, FIELD_TITLE, FIELD_URL, FIELD_VENUE,
};
use std::collections::BTreeMap;

/// Alias (lowercase, whitespace removed) to canonical field name
const ALIASES: &[(&str, &str)] = &[
    ("title", FIELD_TITLE),
    ("startdate", FIELD_START_DATE),
    ("enddate", FIELD_END_DATE),
    ("description", FIELD_DESCRIPTION),
    ("tea", FIELD_DESCRIPTION),
    ("info", FIELD_DESCRIPTION),
    ("venue", FIELD_VENUE),
    ("bar", FIELD_VENUE),
    ("location", FIELD_VENUE),
    ("host", FIELD_VENUE),
    ("address", FIELD_ADDRESS),
    ("city", FIELD_CITY),
    ("price", FIELD_PRICE),
    ("cover", FIELD_PRICE),
    ("cost", FIELD_PRICE),
    ("url", FIELD_URL),
    ("image", FIELD_IMAGE),
    ("coordinates", FIELD_COORDINATES),
    ("source", FIELD_SOURCE),
    ("key", FIELD_KEY),
    ("gmaps", FIELD_GMAPS),
    ("googlemaps", FIELD_GMAPS),
    ("googlemapslink", FIELD_GMAPS),
    ("shortname", "shortName"),
    ("shortername", "shortName"),
    ("shorttitle", "shortName"),
    ("instagram", "instagram"),
    ("ig", "instagram"),
    ("facebook", "facebook"),
    ("fb", "facebook"),
    ("website", "website"),
    ("site", "website"),
    ("twitter", "twitter"),
    ("xtwitter", "twitter"),
    ("x", "twitter"),
    ("email", "email"),
    ("e-mail", "email"),
    ("phone", "phone"),
    ("phonenumber", "phone"),
];

/// Fields stored in dedicated calendar columns rather than notes
const NOTES_EXCLUDED: &[&str] = &[
    FIELD_TITLE,
    FIELD_START_DATE,
    FIELD_END_DATE,
    FIELD_ADDRESS,
    FIELD_COORDINATES,
    FIELD_CITY,
    FIELD_URL,
];

fn alias_key(raw: &str) -> String {
    raw.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Canonical name for a notes key; unknown keys pass through unchanged
pub fn canonical_field_name(raw: &str) -> String {
    let normalized = alias_key(raw);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Parse `key: value` lines into canonical fields; the first alias seen for a slot wins
pub fn parse_notes_into_fields(notes: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for line in notes.lines() {
        let Some((raw_key, value)) = line.split_once(':') else {
            continue;
        };
        let raw_key = raw_key.trim();
        let value = value.trim();
        // bare links such as "https://..." are not key/value pairs
        if raw_key.is_empty() || value.is_empty() || value.starts_with("//") {
            continue;
        }
        fields.entry(canonical_field_name(raw_key)).or_insert_with(|| value.to_string());
    }
    fields
}

/// Render every non-empty field that has no dedicated calendar column, canonical names only
pub fn format_event_notes(event: &Event) -> String {
    event
        .field_names()
        .into_iter()
        .filter(|name| !NOTES_EXCLUDED.contains(&name.as_str()))
        .filter_map(|name| event.field(&name).map(|value| format!("{}: {}", name, single_line(&value))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy parsed notes onto an event, canonical names assumed
pub fn apply_note_fields(event: &mut Event, fields: &BTreeMap<String, String>) {
    for (name, value) in fields {
        event.set_field(name, Some(value.clone()));
    }
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_map_to_canonical_names() {
        assert_eq!(canonical_field_name("Tea"), "description");
        assert_eq!(canonical_field_name("bar"), "venue");
        assert_eq!(canonical_field_name("Cover"), "price");
        assert_eq!(canonical_field_name("Shorter Name"), "shortName");
        assert_eq!(canonical_field_name("Google Maps"), "gmaps");
        assert_eq!(canonical_field_name("Dress Code"), "Dress Code");
    }

    #[test]
    fn test_first_alias_wins() {
        let notes = "tea: Hand-written blurb\ndescription: Scraped blurb\nbar: Eagle\nvenue: Other";
        let fields = parse_notes_into_fields(notes);
        assert_eq!(fields["description"], "Hand-written blurb");
        assert_eq!(fields["venue"], "Eagle");
        assert!(!fields.contains_key("tea"));
        assert!(!fields.contains_key("bar"));
    }

    #[test]
    fn test_values_may_contain_colons_and_blank_lines_are_skipped() {
        let notes = "website: https://example.com/a\n\n: orphan\nempty:\nhttps://bare.link";
        let fields = parse_notes_into_fields(notes);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["website"], "https://example.com/a");
    }

    #[test]
    fn test_format_emits_canonical_keys_and_round_trips() {
        let mut event = Event::new("Bear Happy Hour", "generic");
        event.venue = Some("The Eagle".to_string());
        event.description = Some("Drinks\nand friends".to_string());
        event.url = Some("https://eagle.example/e/1".to_string());
        event.extra.insert("instagram".to_string(), "@eagle".to_string());

        let notes = format_event_notes(&event);
        assert!(notes.contains("venue: The Eagle"));
        assert!(notes.contains("description: Drinks and friends"));
        assert!(!notes.contains("title:"));
        assert!(!notes.contains("url:"));

        let mut restored = Event::new("Bear Happy Hour", "");
        apply_note_fields(&mut restored, &parse_notes_into_fields(&notes));
        assert_eq!(restored.venue, event.venue);
        assert_eq!(restored.source, "generic");
        assert_eq!(restored.extra.get("instagram"), event.extra.get("instagram"));
    }
}
