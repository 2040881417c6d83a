/// Parser name constants to keep config files, the registry and logs consistent
// Registry keys (used in `parser = "..."` in config)
pub const BEARRACUDA_PARSER: &str = "bearracuda";
pub const EVENTBRITE_PARSER: &str = "eventbrite";
pub const GENERIC_PARSER: &str = "generic";
pub const BEARS_SITGES_PARSER: &str = "bears-sitges";

// Source labels stamped on parsed events
pub const BEARRACUDA_SOURCE: &str = "bearracuda";
pub const EVENTBRITE_SOURCE: &str = "eventbrite";
pub const GENERIC_SOURCE: &str = "generic";
pub const BEARS_SITGES_SOURCE: &str = "bears-sitges";

// Placeholder titles
pub const UNTITLED_EVENT: &str = "Untitled Event";
pub const BEARRACUDA_PLACEHOLDER_TITLE: &str = "Bearracuda Event";

/// City key used when nothing in the city table matches
pub const UNKNOWN_CITY: &str = "unknown";

// Crawl limits
pub const DEFAULT_MAX_ADDITIONAL_URLS: usize = 12;
pub const DEFAULT_URL_DISCOVERY_DEPTH: u32 = 1;
pub const DEFAULT_PATTERN_MAX_MATCHES: usize = 10;
pub const BEARRACUDA_MAX_LINKS: usize = 10;
pub const GENERIC_MAX_LINKS: usize = 15;
pub const EVENTBRITE_MAX_LINKS: usize = 20;

/// Festival days parsed from the Bears Sitges page when `max_days` is not set
pub const DEFAULT_SITGES_MAX_DAYS: usize = 14;
pub const SITGES_TIMEZONE: &str = "Europe/Madrid";

/// Default duration for entries that only state a start hour
pub const SINGLE_HOUR_EVENT_HOURS: i64 = 2;

/// Default location of the file-backed calendar
pub const DEFAULT_CALENDAR_PATH: &str = "output/calendar.json";

/// Get all registered parser names
pub fn get_supported_parsers() -> Vec<&'static str> {
    vec![BEARRACUDA_PARSER, EVENTBRITE_PARSER, GENERIC_PARSER, BEARS_SITGES_PARSER]
}

// HTTP client
pub const HTTP_USER_AGENT: &str = concat!("bear_event_scraper/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
