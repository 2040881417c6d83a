use async_trait::async_trait;
use bear_event_scraper::app::ports::{CalendarAdapter, DisplayAdapter, HostAdapters, HttpAdapter};
use bear_event_scraper::config::ParserConfig;
use bear_event_scraper::error::{Result, ScraperError};
use bear_event_scraper::infra::JsonCalendarStore;
use bear_event_scraper::parsers::ParserRegistry;
use bear_event_scraper::pipeline::SharedCore;
use bear_event_scraper::types::{Event, HtmlPage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Serves canned pages and records every URL requested
struct MockHttp {
    pages: HashMap<String, String>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockHttp {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect(),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl HttpAdapter for MockHttp {
    async fn fetch_data(&self, url: &str) -> Result<HtmlPage> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(html) => Ok(HtmlPage::new(html.clone(), url)),
            None => Err(ScraperError::Fetch {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct MockDisplay {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockDisplay {
    fn record(&self, level: &str, message: &str) {
        self.messages.lock().unwrap().push((level.to_string(), message.to_string()));
    }
}

impl DisplayAdapter for MockDisplay {
    fn log_info(&self, _component: &str, message: &str) {
        self.record("info", message);
    }
    fn log_warn(&self, _component: &str, message: &str) {
        self.record("warn", message);
    }
    fn log_error(&self, _component: &str, message: &str) {
        self.record("error", message);
    }
    fn log_success(&self, _component: &str, message: &str) {
        self.record("success", message);
    }
}

#[derive(Default)]
struct MockCalendar {
    written: Arc<Mutex<Vec<Event>>>,
}

#[async_trait]
impl CalendarAdapter for MockCalendar {
    async fn add_to_calendar(&self, events: &[Event], _config: &ParserConfig) -> Result<usize> {
        self.written.lock().unwrap().extend(events.iter().cloned());
        Ok(events.len())
    }
}

struct Harness {
    adapters: HostAdapters,
    requested: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<(String, String)>>>,
    written: Arc<Mutex<Vec<Event>>>,
}

fn harness(pages: &[(&str, &str)]) -> Harness {
    let http = MockHttp::new(pages);
    let display = MockDisplay::default();
    let calendar = MockCalendar::default();
    let requested = http.requested.clone();
    let messages = display.messages.clone();
    let written = calendar.written.clone();
    Harness {
        adapters: HostAdapters::new(Arc::new(http), Arc::new(display), Arc::new(calendar)),
        requested,
        messages,
        written,
    }
}

const HAPPY_HOUR_BARE: &str = r#"<html><body>
  <div class="event-item">
    <h2>Bear Happy Hour</h2>
    <div class="event-date">March 7, 2031 6pm</div>
    <span class="venue">Eagle LA</span>
  </div>
</body></html>"#;

const HAPPY_HOUR_DESCRIBED: &str = r#"<html><body>
  <div class="event-item">
    <h2>Bear Happy Hour</h2>
    <div class="event-date">March 7, 2031 6pm</div>
    <span class="venue">Eagle LA</span>
    <p>Two for one drinks until 9.</p>
  </div>
  <div class="event-item">
    <h2>Yoga Class</h2>
    <div class="event-date">March 8, 2031 10am</div>
    <span class="venue">Studio One</span>
  </div>
</body></html>"#;

const BEARRACUDA_LISTING: &str = r#"<html><body>
  <div class="event-card">
    <h3>Bearracuda Denver</h3>
    <span class="event-date">Saturday, March 15, 2031 9pm - 2am</span>
    <a href="/events/denver">Tickets</a>
  </div>
</body></html>"#;

const BEARRACUDA_DETAIL: &str = r#"<html><body>
  <div class="event-detail">
    <h1>Bearracuda Denver</h1>
    <span class="event-date">Saturday, March 15, 2031 9pm - 2am</span>
    <span class="venue-name">Tracks</span>
    <div class="description">Denver's biggest bear dance party.</div>
  </div>
</body></html>"#;

fn generic_job(name: &str, urls: &[&str]) -> ParserConfig {
    ParserConfig::new(name, "generic", urls.iter().map(|u| u.to_string()).collect())
}

#[tokio::test]
async fn test_same_event_from_two_pages_collapses_to_one() {
    let h = harness(&[
        ("https://eagle.example.com/a", HAPPY_HOUR_BARE),
        ("https://eagle.example.com/b", HAPPY_HOUR_DESCRIBED),
    ]);
    let config = generic_job("Eagle", &["https://eagle.example.com/a", "https://eagle.example.com/b"]);

    let results = SharedCore::new(false)
        .process_events(&[config], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert!(results.errors.is_empty());
    assert_eq!(results.total_events, 3);
    assert_eq!(results.bear_events, 1);
    assert_eq!(results.calendar_events, 1);

    let written = h.written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].title, "Bear Happy Hour");
    assert_eq!(written[0].description.as_deref(), Some("Two for one drinks until 9."));
    assert!(written[0].is_bear_event);
    assert!(written[0].key.is_some());
}

#[tokio::test]
async fn test_repeated_urls_are_fetched_once() {
    let h = harness(&[("https://eagle.example.com/a", HAPPY_HOUR_BARE)]);
    let config = generic_job("Eagle", &["https://eagle.example.com/a", "https://eagle.example.com/a"]);

    let results = SharedCore::new(false)
        .process_events(&[config], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert_eq!(h.requested.lock().unwrap().len(), 1);
    assert_eq!(results.parser_results[0].urls_processed, 1);
    assert_eq!(results.bear_events, 1);
}

#[tokio::test]
async fn test_fetch_failure_skips_only_that_url() {
    let h = harness(&[("https://eagle.example.com/b", HAPPY_HOUR_DESCRIBED)]);
    let config = generic_job("Eagle", &["https://eagle.example.com/missing", "https://eagle.example.com/b"]);

    let results = SharedCore::new(false)
        .process_events(&[config], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert!(results.errors.is_empty());
    assert_eq!(results.bear_events, 1);
    let messages = h.messages.lock().unwrap();
    assert!(messages
        .iter()
        .any(|(level, msg)| level == "warn" && msg.contains("https://eagle.example.com/missing")));
}

#[tokio::test]
async fn test_unknown_parser_fails_only_its_job() {
    let h = harness(&[("https://eagle.example.com/a", HAPPY_HOUR_BARE)]);
    let broken = ParserConfig::new("Broken", "no-such-parser", vec!["https://eagle.example.com/a".to_string()]);
    let good = generic_job("Eagle", &["https://eagle.example.com/a"]);

    let results = SharedCore::new(false)
        .process_events(&[broken, good], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert_eq!(results.errors.len(), 1);
    assert!(results.errors[0].starts_with("Failed to process Broken"));
    assert!(results.errors[0].contains("no-such-parser"));
    assert_eq!(results.parser_results.len(), 1);
    assert_eq!(results.calendar_events, 1);
}

#[tokio::test]
async fn test_disabled_job_is_skipped() {
    let h = harness(&[("https://eagle.example.com/a", HAPPY_HOUR_BARE)]);
    let disabled = ParserConfig {
        enabled: false,
        ..generic_job("Old Eagle", &["https://eagle.example.com/old"])
    };
    let enabled = generic_job("Eagle", &["https://eagle.example.com/a"]);

    let results = SharedCore::new(false)
        .process_events(&[disabled, enabled], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    let requested = h.requested.lock().unwrap();
    assert_eq!(*requested, vec!["https://eagle.example.com/a".to_string()]);
    assert!(results.errors.is_empty());
    assert_eq!(results.parser_results.len(), 1);
    assert_eq!(results.parser_results[0].name, "Eagle");
    assert_eq!(results.calendar_events, 1);
}

#[tokio::test]
async fn test_dry_run_never_touches_calendar() {
    let h = harness(&[("https://eagle.example.com/a", HAPPY_HOUR_BARE)]);
    let config = generic_job("Eagle", &["https://eagle.example.com/a"]);

    let results = SharedCore::new(true)
        .process_events(&[config.clone()], &h.adapters, &ParserRegistry::with_defaults())
        .await;
    assert_eq!(results.bear_events, 1);
    assert_eq!(results.calendar_events, 0);
    assert!(h.written.lock().unwrap().is_empty());

    let job_dry_run = ParserConfig { dry_run: true, ..config };
    let results = SharedCore::new(false)
        .process_events(&[job_dry_run], &h.adapters, &ParserRegistry::with_defaults())
        .await;
    assert_eq!(results.calendar_events, 0);
    assert!(h.written.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_detail_pages_fill_listing_events() {
    let h = harness(&[
        ("https://bearracuda.com/events", BEARRACUDA_LISTING),
        ("https://bearracuda.com/events/denver", BEARRACUDA_DETAIL),
    ]);
    let config = ParserConfig {
        require_detail_pages: true,
        always_bear: true,
        ..ParserConfig::new("Bearracuda", "bearracuda", vec!["https://bearracuda.com/events".to_string()])
    };

    let results = SharedCore::new(false)
        .process_events(&[config], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert!(results.errors.is_empty());
    assert_eq!(
        *h.requested.lock().unwrap(),
        vec![
            "https://bearracuda.com/events".to_string(),
            "https://bearracuda.com/events/denver".to_string(),
        ]
    );
    assert_eq!(results.bear_events, 1);
    let event = &results.all_processed_events[0];
    assert_eq!(event.venue.as_deref(), Some("Tracks"));
    assert_eq!(event.city.as_deref(), Some("denver"));
    assert_eq!(event.description.as_deref(), Some("Denver's biggest bear dance party."));
}

#[tokio::test]
async fn test_detail_crawl_respects_url_budget() {
    let h = harness(&[
        ("https://bearracuda.com/events", BEARRACUDA_LISTING),
        ("https://bearracuda.com/events/denver", BEARRACUDA_DETAIL),
    ]);
    let config = ParserConfig {
        require_detail_pages: true,
        always_bear: true,
        max_additional_urls: Some(0),
        ..ParserConfig::new("Bearracuda", "bearracuda", vec!["https://bearracuda.com/events".to_string()])
    };

    let results = SharedCore::new(true)
        .process_events(&[config], &h.adapters, &ParserRegistry::with_defaults())
        .await;

    assert_eq!(h.requested.lock().unwrap().len(), 1);
    assert_eq!(results.bear_events, 1);
    assert_eq!(results.all_processed_events[0].venue, None);
}

#[tokio::test]
async fn test_rerun_against_json_store_merges_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonCalendarStore::new(dir.path().join("calendar.json")));
    let http = Arc::new(MockHttp::new(&[
        ("https://eagle.example.com/a", HAPPY_HOUR_BARE),
        ("https://eagle.example.com/b", HAPPY_HOUR_DESCRIBED),
    ]));
    let adapters = HostAdapters::new(http, Arc::new(MockDisplay::default()), store.clone());
    let registry = ParserRegistry::with_defaults();
    let core = SharedCore::new(false);

    let first = core
        .process_events(&[generic_job("Eagle", &["https://eagle.example.com/a"])], &adapters, &registry)
        .await;
    assert_eq!(first.calendar_events, 1);

    let second = core
        .process_events(&[generic_job("Eagle", &["https://eagle.example.com/b"])], &adapters, &registry)
        .await;
    assert_eq!(second.calendar_events, 1);

    let stored = store.load().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Bear Happy Hour");
    assert!(stored[0].notes.contains("description: Two for one drinks until 9."));
}
