//! Pipeline metrics
//!
//! Counters and histograms go through the `metrics` facade; whichever
//! recorder the host installs receives them. With no recorder they are no-ops.

/// Metrics for one scraping job, labelled by job name
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// A page was fetched and parsed
    pub fn record_page_parsed(job: &str, events: usize, links: usize) {
        ::metrics::counter!("bear_scraper_pages_parsed_total", "job" => job.to_string()).increment(1);
        ::metrics::histogram!("bear_scraper_events_per_page", "job" => job.to_string()).record(events as f64);
        ::metrics::counter!("bear_scraper_links_discovered_total", "job" => job.to_string()).increment(links as u64);
    }

    /// A page could not be fetched
    pub fn record_fetch_error(job: &str) {
        ::metrics::counter!("bear_scraper_fetch_errors_total", "job" => job.to_string()).increment(1);
    }

    /// A job ran to completion
    pub fn record_job_success(job: &str, raw: usize, kept: usize, written: usize, duration_secs: f64) {
        ::metrics::counter!("bear_scraper_events_parsed_total", "job" => job.to_string()).increment(raw as u64);
        ::metrics::counter!("bear_scraper_events_kept_total", "job" => job.to_string()).increment(kept as u64);
        ::metrics::counter!("bear_scraper_events_written_total", "job" => job.to_string()).increment(written as u64);
        ::metrics::histogram!("bear_scraper_job_duration_seconds", "job" => job.to_string()).record(duration_secs);
    }

    /// A job failed as a whole
    pub fn record_job_error(job: &str) {
        ::metrics::counter!("bear_scraper_job_errors_total", "job" => job.to_string()).increment(1);
    }

    /// Outcome of reconciling one event against the calendar store
    pub fn record_reconcile(decision: &'static str) {
        ::metrics::counter!("bear_scraper_reconcile_total", "decision" => decision).increment(1);
    }
}
