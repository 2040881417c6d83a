use super::html::{attr, first_attr, first_text, outermost, text_of};
use super::EventParser;
use crate::city::extract_city_from_text;
use crate::config::{ParserConfig, UrlPattern};
use crate::constants::{BEARRACUDA_MAX_LINKS, BEARRACUDA_PLACEHOLDER_TITLE, BEARRACUDA_SOURCE};
use crate::dates::parse_event_dates;
use crate::pipeline::urls::{extract_urls, normalize_url};
use crate::types::{non_empty, Event, HtmlPage, ParseResult};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static bearracuda selector")
}

// Tried in order; the first group that yields events wins
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"div[class*="event"], article[class*="event"], section[class*="event"], li[class*="event"]"#),
        selector(r#"div[class*="party"]"#),
        selector(r#"div[class*="card"]"#),
    ]
});

static HEADING: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, h5, h6"));
static TITLE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="title"]"#));
static DATE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="date"]"#));
static DATETIME_ATTR: Lazy<Selector> = Lazy::new(|| selector("[datetime]"));
static DATA_DATE_ATTR: Lazy<Selector> = Lazy::new(|| selector("[data-date]"));
static VENUE_CLASS: Lazy<Selector> =
    Lazy::new(|| selector(r#"[class*="venue"], [class*="location"], [class*="club"]"#));
static DESCRIPTION_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="description"], [class*="details"]"#));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static PERFORMER_CLASS: Lazy<Selector> =
    Lazy::new(|| selector(r#"[class*="dj"], [class*="performer"], [class*="artist"]"#));
static HREF: Lazy<Selector> = Lazy::new(|| selector("[href]"));
static DATA_URL: Lazy<Selector> = Lazy::new(|| selector("[data-url]"));

static SLASH_OR_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2}").expect("static bearracuda date pattern"));

const EXCLUDED_URL_PARTS: &[&str] = &["/admin", "/login", "/wp-admin", "/wp-login", "#", "javascript:", "mailto:"];

fn default_url_patterns() -> Vec<UrlPattern> {
    vec![UrlPattern {
        name: "event-pages".to_string(),
        regex: r#"href="((?:https?://(?:www\.)?bearracuda\.com)?/events?/[^"]+)""#.to_string(),
        max_matches: Some(BEARRACUDA_MAX_LINKS),
    }]
}

/// Bearracuda tour pages: one card per city stop, every stop a bear party
pub struct BearracudaParser;

impl BearracudaParser {
    fn parse_container(&self, element: ElementRef<'_>, page: &HtmlPage, config: &ParserConfig) -> Event {
        let title = first_text(element, &[&HEADING, &TITLE_CLASS]).unwrap_or_else(|| BEARRACUDA_PLACEHOLDER_TITLE.to_string());
        let text = text_of(element);

        let date_text = first_text(element, &[&DATE_CLASS])
            .or_else(|| first_attr(element, &DATETIME_ATTR, "datetime"))
            .or_else(|| first_attr(element, &DATA_DATE_ATTR, "data-date"))
            .or_else(|| SLASH_OR_ISO_DATE.find(&text).map(|m| m.as_str().to_string()));
        let dates = date_text
            .as_deref()
            .and_then(|t| parse_event_dates(t, Utc::now(), config.timezone_or(chrono_tz::UTC)));
        if dates.is_none() {
            debug!("Bearracuda: no usable date for \"{}\"", title);
        }

        let venue = first_text(element, &[&VENUE_CLASS]);
        let description = first_text(element, &[&DESCRIPTION_CLASS]).or_else(|| first_text(element, &[&PARAGRAPH]));
        let performers = first_text(element, &[&PERFORMER_CLASS]);
        let description = match (description, performers) {
            (Some(d), Some(p)) => Some(format!("{d}\n\nPerformers: {p}")),
            (None, Some(p)) => Some(format!("Performers: {p}")),
            (d, None) => d,
        };

        let url = first_attr(element, &HREF, "href")
            .or_else(|| attr(element, "data-url"))
            .or_else(|| element.select(&DATA_URL).find_map(|el| attr(el, "data-url")))
            .and_then(|raw| normalize_url(&raw, &page.url))
            .unwrap_or_else(|| page.url.clone());

        let city_text = format!(
            "{} {} {} {}",
            title,
            venue.as_deref().unwrap_or(""),
            description.as_deref().unwrap_or(""),
            url
        );

        let mut event = Event::new(title, self.name());
        event.start_date = dates.map(|d| d.start);
        event.end_date = dates.and_then(|d| d.end);
        event.venue = venue.and_then(non_empty);
        event.description = description;
        event.url = Some(url);
        event.city = extract_city_from_text(&city_text).map(str::to_string);
        event.is_bear_event = true;
        event
    }

    fn extract_additional_links(&self, page: &HtmlPage, config: &ParserConfig) -> Vec<String> {
        let patterns = if config.url_patterns.is_empty() {
            default_url_patterns()
        } else {
            config.url_patterns.clone()
        };
        extract_urls(&page.html, &patterns, &page.url)
            .into_iter()
            .filter(|url| is_bearracuda_event_url(url))
            .take(BEARRACUDA_MAX_LINKS)
            .collect()
    }
}

fn is_bearracuda_event_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host_ok = parsed
        .host_str()
        .is_some_and(|h| h.contains("bearracuda.com") || h.contains("bearraccuda.com"));
    host_ok && !EXCLUDED_URL_PARTS.iter().any(|part| url.contains(part))
}

impl EventParser for BearracudaParser {
    fn name(&self) -> &'static str {
        BEARRACUDA_SOURCE
    }

    fn parse_events(&self, page: &HtmlPage, config: &ParserConfig) -> ParseResult {
        let mut result = ParseResult::empty(self.name(), &page.url);
        if page.html.trim().is_empty() {
            return result;
        }

        let document = Html::parse_document(&page.html);
        for container in CONTAINERS.iter() {
            let elements = outermost(document.select(container).collect());
            result.events = elements
                .into_iter()
                .map(|el| self.parse_container(el, page, config))
                .collect();
            if !result.events.is_empty() {
                break;
            }
        }

        if config.require_detail_pages {
            result.additional_links = self.extract_additional_links(page, config);
        }

        info!(
            "🐻 Bearracuda: found {} events, {} additional links on {}",
            result.events.len(),
            result.additional_links.len(),
            page.url
        );
        result
    }
}
