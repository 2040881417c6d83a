//! City normalization table and location heuristics.

use crate::constants::UNKNOWN_CITY;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

/// Alternatives (lowercase, `|`-separated) mapped to their city key, checked in order
const CITY_TABLE: &[(&str, &str)] = &[
    ("new york|nyc|manhattan|brooklyn|queens|bronx", "nyc"),
    ("los angeles|hollywood|west hollywood|weho|dtla|long beach|santa monica", "la"),
    ("san francisco|sf|castro|san jose|oakland", "sf"),
    ("chicago|chi", "chicago"),
    ("atlanta|atl", "atlanta"),
    ("miami|south beach|miami beach|fort lauderdale|key west", "miami"),
    ("seattle", "seattle"),
    ("portland", "portland"),
    ("denver", "denver"),
    ("las vegas|vegas", "vegas"),
    ("boston", "boston"),
    ("philadelphia|philly", "philadelphia"),
    ("austin", "austin"),
    ("dallas", "dallas"),
    ("houston", "houston"),
    ("phoenix", "phoenix"),
    ("toronto", "toronto"),
    ("london", "london"),
    ("berlin", "berlin"),
    ("palm springs", "palm-springs"),
    ("san diego", "san-diego"),
    ("sacramento", "sacramento"),
    ("sitges", "sitges"),
    ("new orleans", "new-orleans"),
];

static CITY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CITY_TABLE
        .iter()
        .map(|(alternatives, key)| {
            let body = alternatives
                .split('|')
                .map(|alt| alt.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", body)).expect("static city pattern");
            (re, *key)
        })
        .collect()
});

static STANDALONE_LA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bLA\b").expect("static LA pattern"));

static PLACEHOLDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(tba|tbd|to be announced|to be determined)$",
        r"(?i)^(venue|location|address)?\s*(tba|tbd|pending|coming soon|announced soon)$",
        r"(?i)^(details|info|information)?\s*(coming|to follow|tba|tbd)$",
        r"(?i)^(will be announced|location pending|venue pending)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static placeholder pattern"))
    .collect()
});

static PARTIAL_ADDRESS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(dtla|downtown|midtown|uptown|north|south|east|west|central)\s*,?\s*[a-z\s]+,\s*[a-z]{2}\s*\d{5}$",
        r"(?i)^[a-z\s]+\s+(district|area|zone|neighborhood)\s*,?\s*[a-z\s]+,\s*[a-z]{2}\s*\d{5}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static partial address pattern"))
    .collect()
});

static STREET_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\s+\w+.*\s+\w+").expect("static street pattern"));

static STREET_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(street|st|avenue|ave|road|rd|drive|dr|boulevard|blvd|lane|ln|way|place|pl|court|ct|calle|carrer|passeig)\b")
        .expect("static street suffix pattern")
});

/// City key found in free text (titles, descriptions, venue names)
pub fn extract_city_from_text(text: &str) -> Option<&'static str> {
    if text.trim().is_empty() {
        return None;
    }
    CITY_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, key)| *key)
        .or_else(|| STANDALONE_LA.is_match(text).then_some("la"))
}

/// City key found in a postal address; tries the whole string, then the second comma part
pub fn extract_city_from_address(address: &str) -> Option<&'static str> {
    if let Some(city) = extract_city_from_text(address) {
        return Some(city);
    }
    address
        .split(',')
        .map(str::trim)
        .nth(1)
        .and_then(extract_city_from_text)
}

/// Map arbitrary text onto the closed set of city keys
pub fn normalize_city(text: &str) -> String {
    let trimmed = text.trim();
    if CITY_TABLE.iter().any(|(_, key)| key.eq_ignore_ascii_case(trimmed)) {
        return trimmed.to_lowercase();
    }
    extract_city_from_text(trimmed).unwrap_or(UNKNOWN_CITY).to_string()
}

/// True for a street-level address; false for placeholders, neighborhoods and bare city names
pub fn is_full_address(address: &str) -> bool {
    let clean = address.trim();
    if clean.chars().count() < 10 {
        return false;
    }
    if PLACEHOLDER_PATTERNS.iter().any(|re| re.is_match(clean)) {
        return false;
    }
    if PARTIAL_ADDRESS_PATTERNS.iter().any(|re| re.is_match(clean)) {
        return false;
    }
    let has_street_shape = STREET_NUMBER.is_match(clean)
        || (clean.chars().any(|c| c.is_ascii_digit()) && STREET_SUFFIX.is_match(clean));
    if !has_street_shape {
        return false;
    }
    let city_only = !clean.chars().any(|c| c.is_ascii_digit()) && !STREET_SUFFIX.is_match(clean);
    !city_only
}

/// Parse a `"lat,lng"` pair
pub fn parse_coordinates(coordinates: &str) -> Option<(f64, f64)> {
    let (lat, lng) = coordinates.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    (lat.is_finite() && lng.is_finite()).then_some((lat, lng))
}

/// Google Maps search link from a full address, else from coordinates
pub fn google_maps_url(address: Option<&str>, coordinates: Option<&str>) -> Option<String> {
    if let Some(address) = address.filter(|a| is_full_address(a)) {
        return Url::parse_with_params("https://maps.google.com/", &[("q", address.trim())])
            .ok()
            .map(|u| u.to_string());
    }
    coordinates
        .and_then(parse_coordinates)
        .map(|(lat, lng)| format!("https://maps.google.com/?q={},{}", lat, lng))
}
