use crate::config::ParserConfig;
use crate::error::Result;
use crate::types::{Event, HtmlPage};
use async_trait::async_trait;
use std::sync::Arc;

/// Fetches one page; timeouts and retries are the implementation's business
#[async_trait]
pub trait HttpAdapter: Send + Sync {
    async fn fetch_data(&self, url: &str) -> Result<HtmlPage>;
}

/// Progress reporting for the host environment
pub trait DisplayAdapter: Send + Sync {
    fn log_info(&self, component: &str, message: &str);
    fn log_warn(&self, component: &str, message: &str);
    fn log_error(&self, component: &str, message: &str);
    fn log_success(&self, component: &str, message: &str);
}

/// Persists processed events; returns how many were written
#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    async fn add_to_calendar(&self, events: &[Event], config: &ParserConfig) -> Result<usize>;
}

/// Capabilities chosen once at startup and handed to the core
#[derive(Clone)]
pub struct HostAdapters {
    pub http: Arc<dyn HttpAdapter>,
    pub display: Arc<dyn DisplayAdapter>,
    pub calendar: Arc<dyn CalendarAdapter>,
}

impl HostAdapters {
    pub fn new(http: Arc<dyn HttpAdapter>, display: Arc<dyn DisplayAdapter>, calendar: Arc<dyn CalendarAdapter>) -> Self {
        Self { http, display, calendar }
    }
}
