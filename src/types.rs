use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fetched page as handed to a parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlPage {
    pub html: String,
    pub url: String,
}

impl HtmlPage {
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: url.into(),
        }
    }
}

/// Output of a single parser invocation over one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub events: Vec<Event>,
    pub additional_links: Vec<String>,
    pub source: String,
    pub url: String,
}

impl ParseResult {
    pub fn empty(source: &str, url: &str) -> Self {
        Self {
            events: Vec::new(),
            additional_links: Vec::new(),
            source: source.to_string(),
            url: url.to_string(),
        }
    }
}

/// Per-field policy for reconciling a fresh candidate with a stored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Keep the stored value when it is non-empty
    Preserve,
    /// Always take the incoming value, empty included
    Clobber,
    /// Fill the stored value only when it is empty
    Upsert,
}

impl MergeStrategy {
    /// Strategy applied to fields the candidate declares nothing about
    pub const FALLBACK: MergeStrategy = MergeStrategy::Upsert;

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Preserve => "preserve",
            MergeStrategy::Clobber => "clobber",
            MergeStrategy::Upsert => "upsert",
        }
    }
}

/// Whether a candidate matched a stored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    New,
    Merge,
}

/// Snapshot of both sides of a merge, kept for debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOriginal {
    pub new: Event,
    pub existing: Event,
}

/// One entry as persisted by a calendar store.
///
/// Only the columns a calendar app understands are first-class; every other
/// field travels in `notes` as `key: value` lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCalendarEvent {
    pub id: String,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

// Canonical field names shared by notes, config metadata and merge strategies
pub const FIELD_TITLE: &str = "title";
pub const FIELD_START_DATE: &str = "startDate";
pub const FIELD_END_DATE: &str = "endDate";
pub const FIELD_VENUE: &str = "venue";
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_CITY: &str = "city";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_URL: &str = "url";
pub const FIELD_IMAGE: &str = "image";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_COORDINATES: &str = "coordinates";
pub const FIELD_GMAPS: &str = "gmaps";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_KEY: &str = "key";

/// Typed fields in the order they are emitted into notes
pub const CORE_FIELDS: &[&str] = &[
    FIELD_TITLE,
    FIELD_START_DATE,
    FIELD_END_DATE,
    FIELD_VENUE,
    FIELD_ADDRESS,
    FIELD_CITY,
    FIELD_DESCRIPTION,
    FIELD_URL,
    FIELD_IMAGE,
    FIELD_PRICE,
    FIELD_COORDINATES,
    FIELD_GMAPS,
    FIELD_SOURCE,
    FIELD_KEY,
];

/// Canonical event record produced by parsers and consumed by the merge stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// "lat,lng"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmaps: Option<String>,
    pub source: String,
    #[serde(default)]
    pub is_bear_event: bool,
    /// Optional metadata slots (shortName, instagram, website, ...) keyed by canonical name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    /// Identity key, assigned during deduplication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "_fieldMergeStrategies", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_merge_strategies: BTreeMap<String, MergeStrategy>,
    #[serde(rename = "_action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<EventAction>,
    #[serde(rename = "_original", default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<EventOriginal>>,
}

/// True for `None`, empty and whitespace-only strings
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Trimmed, non-empty text or `None`
pub fn non_empty(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Event {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Every event needs a title and a source to be usable downstream
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.source.trim().is_empty()
    }

    /// Read a field by canonical name as text
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            FIELD_TITLE => Some(self.title.clone()),
            FIELD_START_DATE => self.start_date.map(|d| d.to_rfc3339()),
            FIELD_END_DATE => self.end_date.map(|d| d.to_rfc3339()),
            FIELD_VENUE => self.venue.clone(),
            FIELD_ADDRESS => self.address.clone(),
            FIELD_CITY => self.city.clone(),
            FIELD_DESCRIPTION => self.description.clone(),
            FIELD_URL => self.url.clone(),
            FIELD_IMAGE => self.image.clone(),
            FIELD_PRICE => self.price.clone(),
            FIELD_COORDINATES => self.coordinates.clone(),
            FIELD_GMAPS => self.gmaps.clone(),
            FIELD_SOURCE => Some(self.source.clone()),
            FIELD_KEY => self.key.clone(),
            other => self.extra.get(other).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Write a field by canonical name. `None` clears it.
    ///
    /// Dates must be RFC 3339; anything else leaves the date untouched.
    pub fn set_field(&mut self, name: &str, value: Option<String>) {
        match name {
            FIELD_TITLE => self.title = value.unwrap_or_default(),
            FIELD_START_DATE => {
                if let Some(parsed) = parse_stored_date(value.as_deref()) {
                    self.start_date = parsed;
                }
            }
            FIELD_END_DATE => {
                if let Some(parsed) = parse_stored_date(value.as_deref()) {
                    self.end_date = parsed;
                }
            }
            FIELD_VENUE => self.venue = value,
            FIELD_ADDRESS => self.address = value,
            FIELD_CITY => self.city = value,
            FIELD_DESCRIPTION => self.description = value,
            FIELD_URL => self.url = value,
            FIELD_IMAGE => self.image = value,
            FIELD_PRICE => self.price = value,
            FIELD_COORDINATES => self.coordinates = value,
            FIELD_GMAPS => self.gmaps = value,
            FIELD_SOURCE => self.source = value.unwrap_or_default(),
            FIELD_KEY => self.key = value,
            other => match value {
                Some(v) => {
                    self.extra.insert(other.to_string(), v);
                }
                None => {
                    self.extra.remove(other);
                }
            },
        }
    }

    /// Names of all fields that currently hold a value, typed fields first
    pub fn field_names(&self) -> Vec<String> {
        CORE_FIELDS
            .iter()
            .map(|f| f.to_string())
            .chain(self.extra.keys().cloned())
            .filter(|name| self.field(name).is_some())
            .collect()
    }

    /// Strategy this candidate declares for `field`, or the fallback
    pub fn strategy_for(&self, field: &str) -> MergeStrategy {
        self.field_merge_strategies
            .get(field)
            .copied()
            .unwrap_or(MergeStrategy::FALLBACK)
    }

    /// Copy without the `_original` diagnostic snapshot
    pub fn without_diagnostics(&self) -> Event {
        Event {
            original: None,
            ..self.clone()
        }
    }
}

// Some(None) = explicit clear, Some(Some(d)) = parsed, None = unparseable
fn parse_stored_date(value: Option<&str>) -> Option<Option<DateTime<Utc>>> {
    match value {
        None => Some(None),
        Some(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|d| Some(d.with_timezone(&Utc))),
    }
}
