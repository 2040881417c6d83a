//! Source parsers: pure functions from one fetched page to candidate events.
//!
//! Parsers never fetch, never write and never fail. Malformed markup yields
//! an empty [`ParseResult`]; a fragment that cannot be read is logged and
//! skipped.

pub mod bearracuda;
pub mod bears_sitges;
pub mod eventbrite;
pub mod generic;
pub mod html;

use crate::config::ParserConfig;
use crate::constants::{BEARRACUDA_PARSER, BEARS_SITGES_PARSER, EVENTBRITE_PARSER, GENERIC_PARSER};
use crate::types::{HtmlPage, ParseResult};
use std::collections::HashMap;

pub use bearracuda::BearracudaParser;
pub use bears_sitges::BearsSitgesParser;
pub use eventbrite::EventbriteParser;
pub use generic::GenericParser;

pub trait EventParser: Send + Sync {
    /// Source label stamped on every event this parser produces
    fn name(&self) -> &'static str;

    fn parse_events(&self, page: &HtmlPage, config: &ParserConfig) -> ParseResult;
}

/// Parsers keyed by the `parser = "..."` value used in job configs
pub struct ParserRegistry {
    parsers: HashMap<String, Box<dyn EventParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry holding every built-in parser
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BEARRACUDA_PARSER, Box::new(BearracudaParser));
        registry.register(EVENTBRITE_PARSER, Box::new(EventbriteParser));
        registry.register(GENERIC_PARSER, Box::new(GenericParser));
        registry.register(BEARS_SITGES_PARSER, Box::new(BearsSitgesParser));
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, parser: Box<dyn EventParser>) {
        self.parsers.insert(key.into(), parser);
    }

    pub fn get(&self, key: &str) -> Option<&dyn EventParser> {
        self.parsers.get(key).map(|p| p.as_ref())
    }

    /// Registered keys, sorted
    pub fn list_parsers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
