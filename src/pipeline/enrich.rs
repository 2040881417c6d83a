use super::notes::canonical_field_name;
use crate::city::{extract_city_from_address, extract_city_from_text, google_maps_url, is_full_address, normalize_city};
use crate::config::ParserConfig;
use crate::constants::UNKNOWN_CITY;
use crate::types::{is_blank, Event};
use tracing::debug;

/// Stamp configured metadata onto a parsed candidate.
///
/// Each `metadata` entry records its merge strategy under the canonical
/// field name; an entry with a `value` also sets that field.
pub fn apply_field_merge_strategies(mut event: Event, config: &ParserConfig) -> Event {
    for (raw_name, meta) in &config.metadata {
        let field = canonical_field_name(raw_name);
        if let Some(value) = meta.value.as_deref().filter(|v| !v.trim().is_empty()) {
            event.set_field(&field, Some(value.trim().to_string()));
        }
        event.field_merge_strategies.insert(field, meta.merge);
    }
    event
}

fn is_placeholder_venue(venue: &str) -> bool {
    let lower = venue.to_lowercase();
    lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == "tba") || lower.contains("to be announced")
}

/// Fill city, venue and map link; drop location data that is clearly a placeholder
pub fn enrich_event_location(mut event: Event, config: &ParserConfig) -> Event {
    if is_blank(event.venue.as_deref()) {
        if let Some(default_venue) = config.default_venue.as_deref().filter(|v| !v.trim().is_empty()) {
            event.venue = Some(default_venue.trim().to_string());
        }
    }

    let city_missing = event
        .city
        .as_deref()
        .map_or(true, |c| c.trim().is_empty() || c.eq_ignore_ascii_case(UNKNOWN_CITY));
    if city_missing {
        let search_text = format!(
            "{} {} {}",
            event.title,
            event.venue.as_deref().unwrap_or(""),
            event.description.as_deref().unwrap_or("")
        );
        let detected = event
            .address
            .as_deref()
            .and_then(extract_city_from_address)
            .or_else(|| extract_city_from_text(&search_text))
            .map(str::to_string)
            .or_else(|| {
                config
                    .default_city
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .map(normalize_city)
            });
        event.city = Some(detected.unwrap_or_else(|| UNKNOWN_CITY.to_string()));
    }

    if event.venue.as_deref().is_some_and(is_placeholder_venue) {
        debug!("Placeholder venue for \"{}\"; dropping location data", event.title);
        event.address = None;
        event.coordinates = None;
        event.gmaps = None;
        return event;
    }

    if event.address.as_deref().is_some_and(|a| !is_full_address(a)) {
        debug!("Partial address for \"{}\"; dropping location data", event.title);
        event.address = None;
        event.coordinates = None;
        event.gmaps = None;
    }

    if is_blank(event.gmaps.as_deref()) {
        event.gmaps = google_maps_url(event.address.as_deref(), event.coordinates.as_deref());
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetadataField;
    use crate::types::MergeStrategy;

    #[test]
    fn test_metadata_sets_values_and_strategies() {
        let mut config = ParserConfig::new("Eagle", "generic", vec![]);
        config.metadata.insert(
            "shorter name".to_string(),
            MetadataField {
                value: Some("EAGLE".to_string()),
                merge: MergeStrategy::Upsert,
            },
        );
        config.metadata.insert(
            "tea".to_string(),
            MetadataField {
                value: None,
                merge: MergeStrategy::Preserve,
            },
        );
        let event = apply_field_merge_strategies(Event::new("Bear Night", "generic"), &config);
        assert_eq!(event.extra.get("shortName").map(String::as_str), Some("EAGLE"));
        assert_eq!(event.strategy_for("shortName"), MergeStrategy::Upsert);
        assert_eq!(event.strategy_for("description"), MergeStrategy::Preserve);
        assert_eq!(event.description, None);
    }

    #[test]
    fn test_city_detection_order() {
        let config = ParserConfig {
            default_city: Some("Denver".to_string()),
            ..Default::default()
        };

        let mut from_address = Event::new("Bear Night", "generic");
        from_address.address = Some("1234 Market St, San Francisco, CA 94103".to_string());
        assert_eq!(enrich_event_location(from_address, &config).city.as_deref(), Some("sf"));

        let from_title = Event::new("Bearracuda Chicago", "bearracuda");
        assert_eq!(enrich_event_location(from_title, &config).city.as_deref(), Some("chicago"));

        let fallback = Event::new("Bear Night", "generic");
        assert_eq!(enrich_event_location(fallback, &config).city.as_deref(), Some("denver"));

        let unknown = Event::new("Bear Night", "generic");
        assert_eq!(
            enrich_event_location(unknown, &ParserConfig::default()).city.as_deref(),
            Some(UNKNOWN_CITY)
        );
    }

    #[test]
    fn test_default_city_maps_onto_city_keys() {
        let config = |city: &str| ParserConfig {
            default_city: Some(city.to_string()),
            ..Default::default()
        };
        let enriched = enrich_event_location(Event::new("Saturday Social", "generic"), &config("Los Angeles"));
        assert_eq!(enriched.city.as_deref(), Some("la"));

        let enriched = enrich_event_location(Event::new("Saturday Social", "generic"), &config("Reykjavik"));
        assert_eq!(enriched.city.as_deref(), Some(UNKNOWN_CITY));
    }

    #[test]
    fn test_default_venue_and_maps_link() {
        let config = ParserConfig {
            default_venue: Some("The Eagle".to_string()),
            ..Default::default()
        };
        let mut event = Event::new("Bear Night", "generic");
        event.address = Some("4219 Santa Monica Blvd, Los Angeles, CA".to_string());
        let enriched = enrich_event_location(event, &config);
        assert_eq!(enriched.venue.as_deref(), Some("The Eagle"));
        assert!(enriched.gmaps.unwrap().starts_with("https://maps.google.com/?q="));
    }

    #[test]
    fn test_placeholder_location_is_dropped() {
        let mut tba = Event::new("Bear Night", "generic");
        tba.venue = Some("Venue TBA".to_string());
        tba.address = Some("4219 Santa Monica Blvd, Los Angeles, CA".to_string());
        tba.coordinates = Some("34.09,-118.28".to_string());
        let enriched = enrich_event_location(tba, &ParserConfig::default());
        assert_eq!(enriched.address, None);
        assert_eq!(enriched.gmaps, None);

        let mut partial = Event::new("Bear Night", "generic");
        partial.address = Some("Downtown Denver, CO 80202".to_string());
        partial.coordinates = Some("39.7,-104.9".to_string());
        let enriched = enrich_event_location(partial, &ParserConfig::default());
        assert_eq!(enriched.address, None);
        assert_eq!(enriched.coordinates, None);
        assert_eq!(enriched.city.as_deref(), Some("denver"));
    }
}
