use super::html::{attr, first_attr, first_text, outermost, text_of};
use super::EventParser;
use crate::city::{extract_city_from_address, extract_city_from_text};
use crate::config::{ParserConfig, UrlFilters};
use crate::constants::{EVENTBRITE_MAX_LINKS, EVENTBRITE_SOURCE};
use crate::dates::parse_iso_datetime;
use crate::pipeline::urls::normalize_url;
use crate::types::{non_empty, Event, HtmlPage, ParseResult};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const EVENTBRITE_ORIGIN: &str = "https://www.eventbrite.com";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static eventbrite selector")
}

static SERVER_DATA_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.__SERVER_DATA__\s*=\s*").expect("static server data pattern"));
static EVENT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href=["']([^"']*/e/[^"']*)["']"#).expect("static eventbrite link pattern"));
static ISO_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("static iso timestamp pattern"));
static MEGAWOOF_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)megawoof|d[>\s]*u[>\s]*r[>\s]*o").expect("static megawoof pattern"));

static LD_JSON: Lazy<Selector> = Lazy::new(|| selector(r#"script[type="application/ld+json"]"#));
static CARDS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"div[data-testid^="event-card"]"#),
        selector(r#"div[class*="event-card"]"#),
        selector(r#"article[class*="event"]"#),
        selector(r#"a[href*="/e/"]"#),
    ]
});
static HEADING: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, h5, h6"));
static TITLE_ATTR: Lazy<Selector> = Lazy::new(|| selector("[title]"));
static EVENT_HREF: Lazy<Selector> = Lazy::new(|| selector(r#"a[href*="/e/"]"#));
static ANY_HREF: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static DATETIME_ATTR: Lazy<Selector> = Lazy::new(|| selector("[datetime]"));
static DATA_DATE_ATTR: Lazy<Selector> = Lazy::new(|| selector("[data-date]"));
static LOCATION: Lazy<Selector> = Lazy::new(|| selector(r#"span[class*="location"], div[class*="venue"]"#));

// Organizer pages embed their listing as `window.__SERVER_DATA__ = {...};`
#[derive(Debug, Default, Deserialize)]
struct ServerData {
    #[serde(default)]
    view_data: Option<ViewData>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewData {
    #[serde(default)]
    events: Option<EventLists>,
}

#[derive(Debug, Default, Deserialize)]
struct EventLists {
    #[serde(default)]
    future_events: Vec<ServerEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct TextField {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Moment {
    #[serde(default)]
    utc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerEvent {
    #[serde(default)]
    name: Option<TextField>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<Moment>,
    #[serde(default)]
    end: Option<Moment>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    venue: Option<ServerVenue>,
    #[serde(default)]
    ticket_availability: Option<TicketAvailability>,
    #[serde(default)]
    logo: Option<Logo>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerVenue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<ServerAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerAddress {
    #[serde(default)]
    localized_address_display: Option<String>,
    #[serde(default)]
    city: Option<String>,
    // Eventbrite serialises coordinates as strings on some pages and numbers on others
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TicketAvailability {
    #[serde(default)]
    minimum_ticket_price: Option<TicketPrice>,
}

#[derive(Debug, Default, Deserialize)]
struct TicketPrice {
    #[serde(default)]
    display: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Logo {
    #[serde(default)]
    url: Option<String>,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coordinates(lat: Option<&Value>, lng: Option<&Value>) -> Option<String> {
    let lat = lat.and_then(scalar_string)?;
    let lng = lng.and_then(scalar_string)?;
    Some(format!("{},{}", lat, lng))
}

/// City from structured address data, then the address line, then title and venue, then the URL
fn detect_city(event: &Event, address_city: Option<&str>) -> Option<String> {
    let from_text = || {
        let search = format!("{} {}", event.title, event.venue.as_deref().unwrap_or(""));
        extract_city_from_text(&search)
    };
    let detected = address_city
        .and_then(extract_city_from_text)
        .or_else(|| event.address.as_deref().and_then(extract_city_from_address))
        .or_else(from_text)
        .or_else(|| event.url.as_deref().and_then(extract_city_from_text));

    match detected {
        Some(city) => Some(city.to_string()),
        // Megawoof America runs out of Los Angeles unless a stop is named
        None if MEGAWOOF_TITLE.is_match(&event.title) => Some("la".to_string()),
        None => None,
    }
}

/// Eventbrite organizer and event pages
pub struct EventbriteParser;

impl EventbriteParser {
    fn server_data_events(&self, html: &str, tz: Tz) -> Vec<Event> {
        let Some(start) = SERVER_DATA_START.find(html) else {
            return Vec::new();
        };
        let mut stream = serde_json::Deserializer::from_str(&html[start.end()..]).into_iter::<ServerData>();
        let data = match stream.next() {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                warn!("🎫 Eventbrite: failed to parse window.__SERVER_DATA__: {}", e);
                return Vec::new();
            }
            None => return Vec::new(),
        };

        data.view_data
            .and_then(|v| v.events)
            .map(|lists| lists.future_events)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| self.server_event(raw, tz))
            .collect()
    }

    fn server_event(&self, raw: ServerEvent, tz: Tz) -> Option<Event> {
        let title = raw.name.and_then(|n| n.text).and_then(non_empty)?;
        let url = raw.url.and_then(non_empty)?;

        let mut event = Event::new(title, self.name());
        event.url = Some(url);
        event.description = raw.summary.and_then(non_empty);
        event.start_date = raw.start.and_then(|m| m.utc).and_then(|t| parse_iso_datetime(&t, tz));
        event.end_date = raw.end.and_then(|m| m.utc).and_then(|t| parse_iso_datetime(&t, tz));
        event.price = raw
            .ticket_availability
            .and_then(|t| t.minimum_ticket_price)
            .and_then(|p| p.display)
            .and_then(non_empty);
        event.image = raw.logo.and_then(|l| l.url).and_then(non_empty);

        let mut address_city = None;
        if let Some(venue) = raw.venue {
            event.venue = venue.name.and_then(non_empty);
            if let Some(address) = venue.address {
                event.address = address.localized_address_display.and_then(non_empty);
                event.coordinates = coordinates(address.latitude.as_ref(), address.longitude.as_ref());
                address_city = address.city;
            }
        }
        event.city = detect_city(&event, address_city.as_deref());
        Some(event)
    }

    fn json_ld_events(&self, document: &Html, tz: Tz) -> Vec<Event> {
        let mut events = Vec::new();
        for script in document.select(&LD_JSON) {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    let mut nodes = Vec::new();
                    collect_ld_events(&value, &mut nodes);
                    events.extend(nodes.into_iter().filter_map(|node| self.json_ld_event(node, tz)));
                }
                Err(e) => debug!("🎫 Eventbrite: skipping unreadable JSON-LD block: {}", e),
            }
        }
        events
    }

    fn json_ld_event(&self, node: &Value, tz: Tz) -> Option<Event> {
        let title = node.get("name").and_then(Value::as_str).and_then(non_empty)?;
        let mut event = Event::new(title, self.name());
        let text = |key: &str| node.get(key).and_then(Value::as_str).and_then(non_empty);

        event.start_date = text("startDate").and_then(|t| parse_iso_datetime(&t, tz));
        event.end_date = text("endDate").and_then(|t| parse_iso_datetime(&t, tz));
        event.url = text("url");
        event.description = text("description");
        event.image = match node.get("image") {
            Some(Value::String(s)) => non_empty(s),
            Some(Value::Array(items)) => items.iter().find_map(|i| i.as_str()).and_then(non_empty),
            Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str).and_then(non_empty),
            _ => None,
        };
        event.price = ld_offer_price(node.get("offers"));

        let mut address_city = None;
        if let Some(location) = node.get("location") {
            event.venue = location.get("name").and_then(Value::as_str).and_then(non_empty);
            match location.get("address") {
                Some(Value::String(line)) => event.address = non_empty(line),
                Some(address) if address.is_object() => {
                    let parts: Vec<&str> = ["streetAddress", "addressLocality", "addressRegion", "postalCode"]
                        .iter()
                        .filter_map(|k| address.get(*k).and_then(Value::as_str))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .collect();
                    event.address = non_empty(parts.join(", "));
                    address_city = address.get("addressLocality").and_then(Value::as_str).map(str::to_string);
                }
                _ => {}
            }
            if let Some(geo) = location.get("geo") {
                event.coordinates = coordinates(geo.get("latitude"), geo.get("longitude"));
            }
        }
        event.city = detect_city(&event, address_city.as_deref());
        Some(event)
    }

    fn html_card_events(&self, document: &Html, page: &HtmlPage, tz: Tz) -> Vec<Event> {
        for cards in CARDS.iter() {
            let events: Vec<Event> = outermost(document.select(cards).collect())
                .into_iter()
                .filter_map(|card| self.html_card_event(card, page, tz))
                .collect();
            if !events.is_empty() {
                return events;
            }
        }
        Vec::new()
    }

    fn html_card_event(&self, card: ElementRef<'_>, page: &HtmlPage, tz: Tz) -> Option<Event> {
        let title = first_text(card, &[&HEADING])
            .or_else(|| first_attr(card, &TITLE_ATTR, "title"))
            .or_else(|| non_empty(text_of(card)));
        let Some(title) = title else {
            debug!("🎫 Eventbrite: card without a title on {}", page.url);
            return None;
        };

        let url = attr(card, "href")
            .filter(|h| h.contains("/e/"))
            .or_else(|| card.select(&EVENT_HREF).find_map(|a| attr(a, "href")))
            .or_else(|| card.select(&ANY_HREF).find_map(|a| attr(a, "href")))
            .and_then(|href| normalize_url(&href, &page.url));
        let date_text = first_attr(card, &DATETIME_ATTR, "datetime")
            .or_else(|| first_attr(card, &DATA_DATE_ATTR, "data-date"))
            .or_else(|| ISO_TIMESTAMP.find(&text_of(card)).map(|m| m.as_str().to_string()));

        let mut event = Event::new(title, self.name());
        event.url = url;
        event.start_date = date_text.and_then(|t| parse_iso_datetime(&t, tz));
        event.venue = first_text(card, &[&LOCATION]);
        event.city = detect_city(&event, None);
        Some(event)
    }

    fn extract_additional_links(&self, html: &str, config: &ParserConfig) -> Vec<String> {
        let cap = config.max_additional_urls.unwrap_or(EVENTBRITE_MAX_LINKS);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for caps in EVENT_LINK.captures_iter(html) {
            if links.len() >= cap {
                break;
            }
            let href = caps[1].trim();
            let absolute = if href.starts_with("http") {
                href.to_string()
            } else if href.starts_with('/') {
                format!("{}{}", EVENTBRITE_ORIGIN, href)
            } else {
                continue;
            };
            let cleaned = absolute.split(['?', '#']).next().unwrap_or_default().to_string();
            if is_eventbrite_event_url(&cleaned, config.url_filters.as_ref()) && seen.insert(cleaned.clone()) {
                links.push(cleaned);
            }
        }
        links
    }
}

// Event nodes from a JSON-LD document: top level, arrays, or an `@graph`
fn collect_ld_events<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_ld_events(item, out)),
        Value::Object(obj) => {
            let is_event = match obj.get("@type") {
                Some(Value::String(t)) => t.ends_with("Event"),
                Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(|t| t.ends_with("Event")),
                _ => false,
            };
            if is_event {
                out.push(value);
            } else if let Some(graph) = obj.get("@graph") {
                collect_ld_events(graph, out);
            }
        }
        _ => {}
    }
}

fn ld_offer_price(offers: Option<&Value>) -> Option<String> {
    let offer = match offers? {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let amount = offer
        .get("price")
        .or_else(|| offer.get("lowPrice"))
        .and_then(scalar_string)?;
    match offer.get("priceCurrency").and_then(Value::as_str) {
        Some(currency) => Some(format!("{} {}", amount, currency)),
        None => Some(amount),
    }
}

fn matches_filter(patterns: &[String], url: &str) -> bool {
    patterns.iter().any(|pattern| match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(url),
        Err(e) => {
            warn!("Ignoring invalid url filter '{}': {}", pattern, e);
            false
        }
    })
}

fn is_eventbrite_event_url(url: &str, filters: Option<&UrlFilters>) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !parsed.host_str().is_some_and(|h| h.contains("eventbrite.com")) || !parsed.path().contains("/e/") {
        return false;
    }
    match filters {
        Some(filters) => {
            (filters.include.is_empty() || matches_filter(&filters.include, url))
                && !matches_filter(&filters.exclude, url)
        }
        None => true,
    }
}

impl EventParser for EventbriteParser {
    fn name(&self) -> &'static str {
        EVENTBRITE_SOURCE
    }

    fn parse_events(&self, page: &HtmlPage, config: &ParserConfig) -> ParseResult {
        let mut result = ParseResult::empty(self.name(), &page.url);
        if page.html.trim().is_empty() {
            return result;
        }
        let tz = config.timezone_or(chrono_tz::UTC);

        result.events = self.server_data_events(&page.html, tz);
        if result.events.is_empty() {
            let document = Html::parse_document(&page.html);
            result.events = self.json_ld_events(&document, tz);
            if result.events.is_empty() {
                debug!("🎫 Eventbrite: no embedded data on {}, reading event cards", page.url);
                result.events = self.html_card_events(&document, page, tz);
            }
        }

        if config.require_detail_pages {
            result.additional_links = self.extract_additional_links(&page.html, config);
        }

        info!(
            "🎫 Eventbrite: found {} events, {} additional links on {}",
            result.events.len(),
            result.additional_links.len(),
            page.url
        );
        result
    }
}
