use super::html::{first_attr, first_text, outermost, text_of};
use super::EventParser;
use crate::config::ParserConfig;
use crate::constants::{GENERIC_MAX_LINKS, GENERIC_SOURCE, UNTITLED_EVENT};
use crate::dates::parse_event_dates;
use crate::pipeline::urls::{extract_urls, host_of, normalize_url};
use crate::types::{non_empty, Event, HtmlPage, ParseResult};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static generic selector")
}

// Tried in order; the first tier that yields events wins
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"div[class*="event"]"#,
        r#"div[class*="party"]"#,
        r#"div[class*="show"]"#,
        r#"div[class*="listing"]"#,
        "article",
        r#"div[class*="post"]"#,
        r#"div[class*="entry"]"#,
        r#"li[class*="event"], li[class*="party"]"#,
    ]
    .iter()
    .map(|css| selector(css))
    .collect()
});

static HEADING: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, h5, h6"));
static TITLE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="title"]"#));
static NAME_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="name"]"#));
static EMPHASIS: Lazy<Selector> = Lazy::new(|| selector("strong, b"));
static DATE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="date"]"#));
static TIME_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="time"]:not([class*="date"])"#));
static DATETIME_ATTR: Lazy<Selector> = Lazy::new(|| selector("[datetime]"));
static DATA_DATE_ATTR: Lazy<Selector> = Lazy::new(|| selector("[data-date]"));
static VENUE_CLASS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"[class*="venue"]:not([class*="address"]), [class*="location"]:not([class*="address"]), [class*="place"]"#)
});
static ADDRESS_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="address"]"#));
static DATA_ADDRESS_ATTR: Lazy<Selector> = Lazy::new(|| selector("[data-address]"));
static DESCRIPTION_CLASS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"[class*="description"], [class*="details"], [class*="summary"], [class*="content"]"#)
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static PRICE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="price"], [class*="cost"]"#));
static HREF: Lazy<Selector> = Lazy::new(|| selector("[href]"));
static DATA_URL: Lazy<Selector> = Lazy::new(|| selector("[data-url]"));

static STREET_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s+[^,]+,\s*[^,]+,\s*[A-Z]{2}\b").expect("static street address pattern"));
static DOLLAR_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+(?:\.\d{2})?").expect("static price pattern"));
static FREE_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(free|gratis|no charge)\b").expect("static free pattern"));

const EXCLUDED_URL_PARTS: &[&str] = &[
    "/admin",
    "/login",
    "/wp-admin",
    "/wp-login",
    "/user/",
    "/profile/",
    "#",
    "javascript:",
    "mailto:",
    "tel:",
    "sms:",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "youtube.com",
];
const EVENT_PATH_KEYWORDS: &[&str] = &["event", "party", "show", "calendar", "listing"];

fn plausible_address(text: &str) -> bool {
    text.len() > 10 && text.chars().any(|c| c.is_ascii_digit())
}

/// Heuristic parser for venue sites without a dedicated parser
pub struct GenericParser;

impl GenericParser {
    fn parse_container(&self, element: ElementRef<'_>, page: &HtmlPage, config: &ParserConfig) -> Event {
        let text = text_of(element);
        let title = first_text(element, &[&HEADING, &TITLE_CLASS, &NAME_CLASS, &EMPHASIS])
            .unwrap_or_else(|| UNTITLED_EVENT.to_string());

        let date_text = first_text(element, &[&DATE_CLASS])
            .map(|date| match first_text(element, &[&TIME_CLASS]) {
                Some(time) => format!("{date} {time}"),
                None => date,
            })
            .or_else(|| first_attr(element, &DATETIME_ATTR, "datetime"))
            .or_else(|| first_attr(element, &DATA_DATE_ATTR, "data-date"))
            .unwrap_or_else(|| text.clone());
        let dates = parse_event_dates(&date_text, Utc::now(), config.timezone_or(chrono_tz::UTC));
        if dates.is_none() {
            debug!("Generic: no usable date for \"{}\" on {}", title, page.url);
        }

        let address = first_text(element, &[&ADDRESS_CLASS])
            .filter(|a| plausible_address(a))
            .or_else(|| STREET_ADDRESS.find(&text).map(|m| m.as_str().to_string()))
            .or_else(|| first_attr(element, &DATA_ADDRESS_ATTR, "data-address"))
            .filter(|a| plausible_address(a));

        let price = first_text(element, &[&PRICE_CLASS])
            .or_else(|| DOLLAR_PRICE.find(&text).map(|m| m.as_str().to_string()))
            .or_else(|| FREE_PRICE.find(&text).map(|m| m.as_str().to_string()));

        let url = first_attr(element, &HREF, "href")
            .or_else(|| first_attr(element, &DATA_URL, "data-url"))
            .and_then(|raw| normalize_url(&raw, &page.url))
            .unwrap_or_else(|| page.url.clone());

        let mut event = Event::new(title, self.name());
        event.start_date = dates.map(|d| d.start);
        event.end_date = dates.and_then(|d| d.end);
        event.venue = first_text(element, &[&VENUE_CLASS]);
        event.address = address;
        event.description =
            first_text(element, &[&DESCRIPTION_CLASS]).or_else(|| first_text(element, &[&PARAGRAPH]));
        event.price = price.and_then(non_empty);
        event.url = Some(url);
        event
    }

    fn extract_additional_links(&self, page: &HtmlPage, config: &ParserConfig) -> Vec<String> {
        if config.url_patterns.is_empty() {
            warn!("Generic: url discovery requested for {} but no url_patterns are configured", config.name);
            return Vec::new();
        }
        extract_urls(&page.html, &config.url_patterns, &page.url)
            .into_iter()
            .filter(|url| is_same_site_event_url(url, &page.url))
            .take(GENERIC_MAX_LINKS)
            .collect()
    }
}

fn is_same_site_event_url(url: &str, source_url: &str) -> bool {
    let (Some(host), Some(source_host)) = (host_of(url), host_of(source_url)) else {
        return false;
    };
    if !host.contains(&source_host) && !source_host.contains(&host) {
        return false;
    }
    let lower = url.to_lowercase();
    if EXCLUDED_URL_PARTS.iter().any(|part| lower.contains(part)) {
        return false;
    }
    let path = Url::parse(url).map(|u| u.path().to_lowercase()).unwrap_or_default();
    EVENT_PATH_KEYWORDS.iter().any(|keyword| path.contains(keyword))
}

impl EventParser for GenericParser {
    fn name(&self) -> &'static str {
        GENERIC_SOURCE
    }

    fn parse_events(&self, page: &HtmlPage, config: &ParserConfig) -> ParseResult {
        let mut result = ParseResult::empty(self.name(), &page.url);
        if page.html.trim().is_empty() {
            return result;
        }

        let document = Html::parse_document(&page.html);
        for container in CONTAINERS.iter() {
            result.events = outermost(document.select(container).collect())
                .into_iter()
                .map(|el| self.parse_container(el, page, config))
                .collect();
            if !result.events.is_empty() {
                break;
            }
        }

        if config.url_discovery_depth.is_some_and(|depth| depth > 0) {
            result.additional_links = self.extract_additional_links(page, config);
        }

        info!(
            "🔧 Generic: found {} events, {} additional links on {}",
            result.events.len(),
            result.additional_links.len(),
            page.url
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrlPattern;
    use chrono::{Datelike, Timelike};

    const VENUE_PAGE: &str = r#"<html><body>
        <div class="event-item">
          <h2>Bear Happy Hour</h2>
          <div class="event-date">March 7, 2031</div>
          <div class="event-time">6pm - 9pm</div>
          <span class="venue">Eagle Bar</span>
          <span class="location-address">4219 Santa Monica Blvd, Los Angeles, CA 90029</span>
          <p>Drinks specials all night.</p>
          <span class="price">$5 cover</span>
          <a href="/events/bear-happy-hour">Details</a>
        </div>
        <div class="event-item">
          <div class="summary">No heading here. Free entry. 3/14/2031</div>
        </div>
        <a href="/events/cub-night">Cub Night</a>
        <a href="/about">About</a>
        <a href="https://facebook.com/events/1">FB</a>
    </body></html>"#;

    #[test]
    fn test_parses_event_containers() {
        let page = HtmlPage::new(VENUE_PAGE, "https://eagle.example.com/calendar");
        let result = GenericParser.parse_events(&page, &ParserConfig::default());
        assert_eq!(result.events.len(), 2);

        let first = &result.events[0];
        assert_eq!(first.title, "Bear Happy Hour");
        assert_eq!(first.venue.as_deref(), Some("Eagle Bar"));
        assert_eq!(first.address.as_deref(), Some("4219 Santa Monica Blvd, Los Angeles, CA 90029"));
        assert_eq!(first.description.as_deref(), Some("Drinks specials all night."));
        assert_eq!(first.price.as_deref(), Some("$5 cover"));
        assert_eq!(first.url.as_deref(), Some("https://eagle.example.com/events/bear-happy-hour"));
        let start = first.start_date.unwrap();
        assert_eq!((start.year(), start.month(), start.day(), start.hour()), (2031, 3, 7, 18));
        assert_eq!(first.end_date.unwrap().hour(), 21);
        assert!(!first.is_bear_event);

        let second = &result.events[1];
        assert_eq!(second.title, UNTITLED_EVENT);
        assert_eq!(second.price.as_deref(), Some("Free"));
        assert_eq!(second.url.as_deref(), Some("https://eagle.example.com/calendar"));
        assert_eq!(second.start_date.unwrap().day(), 14);
    }

    #[test]
    fn test_links_need_patterns_and_depth() {
        let page = HtmlPage::new(VENUE_PAGE, "https://eagle.example.com/calendar");
        let mut config = ParserConfig {
            url_discovery_depth: Some(1),
            ..Default::default()
        };
        assert!(GenericParser.parse_events(&page, &config).additional_links.is_empty());

        config.url_patterns = vec![UrlPattern {
            name: "links".to_string(),
            regex: r#"href="([^"]+)""#.to_string(),
            max_matches: Some(10),
        }];
        let links = GenericParser.parse_events(&page, &config).additional_links;
        assert_eq!(
            links,
            vec![
                "https://eagle.example.com/events/bear-happy-hour".to_string(),
                "https://eagle.example.com/events/cub-night".to_string(),
            ]
        );

        config.url_discovery_depth = Some(0);
        assert!(GenericParser.parse_events(&page, &config).additional_links.is_empty());
    }
}
