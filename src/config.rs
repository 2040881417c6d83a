use crate::constants::{DEFAULT_CALENDAR_PATH, DEFAULT_MAX_ADDITIONAL_URLS, DEFAULT_PATTERN_MAX_MATCHES, DEFAULT_URL_DISCOVERY_DEPTH};
use crate::error::{Result, ScraperError};
use crate::types::MergeStrategy;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const CONFIG_ENV_VAR: &str = "BEAR_SCRAPER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "scraper.toml";

/// Top-level run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Skip calendar writes for every job
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_calendar_path")]
    pub calendar_path: String,
    #[serde(default)]
    pub parsers: Vec<ParserConfig>,
}

fn default_calendar_path() -> String {
    DEFAULT_CALENDAR_PATH.to_string()
}

/// One configured scraping job
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    pub name: String,
    /// Registry key of the parser to run
    pub parser: String,
    pub urls: Vec<String>,
    /// Disabled jobs stay in the file but are skipped
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub default_venue: Option<String>,
    #[serde(default)]
    pub default_city: Option<String>,
    #[serde(default)]
    pub always_bear: bool,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub require_keywords: bool,
    #[serde(default)]
    pub require_detail_pages: bool,
    #[serde(default)]
    pub max_additional_urls: Option<usize>,
    #[serde(default)]
    pub url_discovery_depth: Option<u32>,
    #[serde(default)]
    pub days_to_look_ahead: Option<i64>,
    #[serde(default)]
    pub dry_run: bool,
    /// Field values and merge strategies stamped onto every candidate
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataField>,
    #[serde(default)]
    pub url_patterns: Vec<UrlPattern>,
    #[serde(default)]
    pub url_filters: Option<UrlFilters>,
    /// Festival days to parse from multi-day pages
    #[serde(default)]
    pub max_days: Option<usize>,
    /// IANA zone used for wall-clock times without an offset
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            parser: String::new(),
            urls: Vec::new(),
            enabled: true,
            default_venue: None,
            default_city: None,
            always_bear: false,
            allowlist: Vec::new(),
            require_keywords: false,
            require_detail_pages: false,
            max_additional_urls: None,
            url_discovery_depth: None,
            days_to_look_ahead: None,
            dry_run: false,
            metadata: BTreeMap::new(),
            url_patterns: Vec::new(),
            url_filters: None,
            max_days: None,
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataField {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default = "default_metadata_merge")]
    pub merge: MergeStrategy,
}

fn default_metadata_merge() -> MergeStrategy {
    MergeStrategy::Preserve
}

/// Named regex used to discover links in raw HTML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlPattern {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub max_matches: Option<usize>,
}

impl UrlPattern {
    pub fn max_matches(&self) -> usize {
        self.max_matches.unwrap_or(DEFAULT_PATTERN_MAX_MATCHES)
    }
}

/// Include/exclude regexes applied to discovered links
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UrlFilters {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ScraperConfig {
    /// Load from an explicit path, `BEAR_SCRAPER_CONFIG`, or `scraper.toml`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
                .into(),
        };
        let content = fs::read_to_string(&config_path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", config_path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ScraperConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for parser in &self.parsers {
            parser.validate()?;
        }
        Ok(())
    }
}

impl ParserConfig {
    pub fn new(name: impl Into<String>, parser: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            parser: parser.into(),
            urls,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScraperError::Config("parser job is missing a name".to_string()));
        }
        if self.parser.trim().is_empty() {
            return Err(ScraperError::Config(format!("job '{}' does not name a parser", self.name)));
        }
        if let Some(tz) = &self.timezone {
            tz.parse::<Tz>()
                .map_err(|e| ScraperError::Config(format!("job '{}' has invalid timezone '{}': {}", self.name, tz, e)))?;
        }
        for pattern in &self.url_patterns {
            regex::Regex::new(&pattern.regex).map_err(|e| {
                ScraperError::Config(format!("job '{}' url pattern '{}' is invalid: {}", self.name, pattern.name, e))
            })?;
        }
        Ok(())
    }

    pub fn max_additional_urls(&self) -> usize {
        self.max_additional_urls.unwrap_or(DEFAULT_MAX_ADDITIONAL_URLS)
    }

    pub fn url_discovery_depth(&self) -> u32 {
        self.url_discovery_depth.unwrap_or(DEFAULT_URL_DISCOVERY_DEPTH)
    }

    /// Configured zone, or `fallback` when unset or unknown
    pub fn timezone_or(&self, fallback: Tz) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|tz| tz.parse::<Tz>().ok())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
dry_run = true

[[parsers]]
name = "Bearracuda"
parser = "bearracuda"
urls = ["https://bearracuda.com/events"]
always_bear = true
require_detail_pages = true
max_additional_urls = 5

[parsers.metadata.shortName]
value = "BRCD"
merge = "upsert"

[parsers.metadata.description]
merge = "clobber"

[[parsers]]
name = "Sitges"
parser = "bears-sitges"
urls = ["https://bearssitges.org/programa"]
timezone = "Europe/Madrid"
days_to_look_ahead = 120
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = ScraperConfig::from_toml(SAMPLE).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.calendar_path, DEFAULT_CALENDAR_PATH);
        assert_eq!(config.parsers.len(), 2);

        let bearracuda = &config.parsers[0];
        assert!(bearracuda.always_bear);
        assert_eq!(bearracuda.max_additional_urls(), 5);
        assert_eq!(bearracuda.url_discovery_depth(), DEFAULT_URL_DISCOVERY_DEPTH);
        assert_eq!(bearracuda.metadata["shortName"].value.as_deref(), Some("BRCD"));
        assert_eq!(bearracuda.metadata["shortName"].merge, MergeStrategy::Upsert);
        assert_eq!(bearracuda.metadata["description"].merge, MergeStrategy::Clobber);

        let sitges = &config.parsers[1];
        assert_eq!(sitges.max_additional_urls(), DEFAULT_MAX_ADDITIONAL_URLS);
        assert_eq!(sitges.days_to_look_ahead, Some(120));
        assert_eq!(sitges.timezone_or(chrono_tz::UTC), chrono_tz::Europe::Madrid);
    }

    #[test]
    fn test_jobs_are_enabled_unless_switched_off() {
        let toml = r#"
[[parsers]]
name = "on"
parser = "generic"
urls = []

[[parsers]]
name = "off"
parser = "generic"
urls = []
enabled = false
"#;
        let config = ScraperConfig::from_toml(toml).unwrap();
        assert!(config.parsers[0].enabled);
        assert!(!config.parsers[1].enabled);
        assert!(ParserConfig::default().enabled);
    }

    #[test]
    fn test_metadata_merge_defaults_to_preserve() {
        let toml = r#"
[[parsers]]
name = "x"
parser = "generic"
urls = []
[parsers.metadata.website]
value = "https://example.com"
"#;
        let config = ScraperConfig::from_toml(toml).unwrap();
        assert_eq!(config.parsers[0].metadata["website"].merge, MergeStrategy::Preserve);
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let toml = r#"
[[parsers]]
name = "x"
parser = "generic"
urls = []
timezone = "Mars/Olympus"
"#;
        let err = ScraperConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraper.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = ScraperConfig::load(Some(&path)).unwrap();
        assert_eq!(config.parsers[0].name, "Bearracuda");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ScraperConfig::load(Some(Path::new("/nonexistent/scraper.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
