use super::dedup::deduplicate_events;
use super::enrich::{apply_field_merge_strategies, enrich_event_location};
use super::filter::{filter_bear_events, filter_future_events};
use super::urls::deduplicate_urls;
use crate::app::ports::HostAdapters;
use crate::config::ParserConfig;
use crate::constants::UNKNOWN_CITY;
use crate::error::{Result, ScraperError};
use crate::metrics::PipelineMetrics;
use crate::parsers::{EventParser, ParserRegistry};
use crate::types::{Event, FIELD_CITY};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const COMPONENT: &str = "SharedCore";

/// Outcome of one configured job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserRunResult {
    pub name: String,
    pub parser: String,
    /// Raw candidates collected across all fetched pages
    pub total_events: usize,
    /// Candidates left after filtering and deduplication
    pub bear_events: usize,
    /// Entries the calendar adapter reported as written
    pub calendar_events: usize,
    pub urls_processed: usize,
    pub events: Vec<Event>,
}

/// Totals for a whole run plus the per-job breakdown
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResults {
    pub total_events: usize,
    pub bear_events: usize,
    pub calendar_events: usize,
    pub errors: Vec<String>,
    pub parser_results: Vec<ParserRunResult>,
    pub all_processed_events: Vec<Event>,
}

/// Host-agnostic event processor.
///
/// Jobs run one after another and every fetch is awaited in turn; the only
/// state is the per-job set of URLs already fetched.
pub struct SharedCore {
    dry_run: bool,
}

impl SharedCore {
    /// `dry_run` skips calendar writes for every job, whatever the job says
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Run every configured job; a failing job is recorded and the rest still run
    #[instrument(skip_all, fields(jobs = configs.len(), dry_run = self.dry_run))]
    pub async fn process_events(
        &self,
        configs: &[ParserConfig],
        adapters: &HostAdapters,
        registry: &ParserRegistry,
    ) -> ProcessingResults {
        let mut results = ProcessingResults::default();
        info!("🚀 Processing {} parser job(s)", configs.len());

        for config in configs {
            if !config.enabled {
                info!("Skipping disabled parser {}", config.name);
                continue;
            }
            match self.process_parser(config, adapters, registry).await {
                Ok(run) => {
                    results.total_events += run.total_events;
                    results.bear_events += run.bear_events;
                    results.calendar_events += run.calendar_events;
                    results.all_processed_events.extend(run.events.iter().cloned());
                    results.parser_results.push(run);
                }
                Err(e) => {
                    let message = format!("Failed to process {}: {}", config.name, e);
                    error!("{}", message);
                    adapters.display.log_error(COMPONENT, &message);
                    PipelineMetrics::record_job_error(&config.name);
                    results.errors.push(message);
                }
            }
        }

        info!(
            "✅ Run finished: {} raw, {} kept, {} written, {} error(s)",
            results.total_events,
            results.bear_events,
            results.calendar_events,
            results.errors.len()
        );
        results
    }

    /// Fetch, parse, crawl, filter, deduplicate and hand off one job
    #[instrument(skip(self, adapters, registry), fields(job = %config.name, parser = %config.parser))]
    pub async fn process_parser(
        &self,
        config: &ParserConfig,
        adapters: &HostAdapters,
        registry: &ParserRegistry,
    ) -> Result<ParserRunResult> {
        let started = Instant::now();
        let parser = registry
            .get(&config.parser)
            .ok_or_else(|| ScraperError::ParserNotFound(config.parser.clone()))?;

        adapters
            .display
            .log_info(COMPONENT, &format!("Processing {} with {} parser", config.name, parser.name()));

        let mut processed_urls: HashSet<String> = HashSet::new();
        let mut events: Vec<Event> = Vec::new();
        let mut discovered: Vec<String> = Vec::new();

        for url in &config.urls {
            if !processed_urls.insert(url.clone()) {
                debug!("Skipping already processed URL {}", url);
                continue;
            }
            let Some((page_events, links)) = fetch_and_parse(parser, url, config, adapters).await else {
                continue;
            };
            events.extend(page_events);
            discovered.extend(links);
        }

        if config.require_detail_pages && !discovered.is_empty() {
            self.crawl_detail_pages(parser, config, adapters, discovered, &mut processed_urls, &mut events)
                .await;
        }

        let total_events = events.len();
        let future = filter_future_events(events, config.days_to_look_ahead);
        debug!("{} of {} events are upcoming", future.len(), total_events);
        let bear = filter_bear_events(future, config);
        let deduped = deduplicate_events(bear);
        info!("🐻 {}: {} raw events, {} after filtering and dedup", config.name, total_events, deduped.len());

        let calendar_events = if self.dry_run || config.dry_run {
            info!("Dry run: skipping calendar for {}", config.name);
            0
        } else {
            adapters.calendar.add_to_calendar(&deduped, config).await?
        };

        adapters.display.log_success(
            COMPONENT,
            &format!(
                "{}: {} events found, {} kept, {} added to calendar",
                config.name,
                total_events,
                deduped.len(),
                calendar_events
            ),
        );
        PipelineMetrics::record_job_success(
            &config.name,
            total_events,
            deduped.len(),
            calendar_events,
            started.elapsed().as_secs_f64(),
        );

        Ok(ParserRunResult {
            name: config.name.clone(),
            parser: config.parser.clone(),
            total_events,
            bear_events: deduped.len(),
            calendar_events,
            urls_processed: processed_urls.len(),
            events: deduped,
        })
    }

    /// Breadth-first crawl of discovered links.
    ///
    /// At most `max_additional_urls` pages are fetched in total across all
    /// levels, and no deeper than `url_discovery_depth` (at least one level).
    async fn crawl_detail_pages(
        &self,
        parser: &dyn EventParser,
        config: &ParserConfig,
        adapters: &HostAdapters,
        discovered: Vec<String>,
        processed_urls: &mut HashSet<String>,
        events: &mut Vec<Event>,
    ) {
        let max_depth = config.url_discovery_depth().max(1);
        let mut budget = config.max_additional_urls();
        let mut frontier = deduplicate_urls(&discovered, processed_urls);
        let mut depth = 1;

        while depth <= max_depth && budget > 0 && !frontier.is_empty() {
            frontier.truncate(budget);
            info!(
                "🔎 {}: crawling {} detail page(s) at depth {}/{}",
                config.name,
                frontier.len(),
                depth,
                max_depth
            );
            let detail_config = ParserConfig {
                require_detail_pages: depth < max_depth,
                url_discovery_depth: Some(max_depth - depth),
                ..config.clone()
            };

            let mut next = Vec::new();
            for url in frontier {
                if !processed_urls.insert(url.clone()) {
                    continue;
                }
                budget = budget.saturating_sub(1);
                let Some((detail_events, links)) = fetch_and_parse(parser, &url, &detail_config, adapters).await
                else {
                    continue;
                };
                for detail in detail_events {
                    merge_detail_event(events, detail, &url, config);
                }
                next.extend(links);
            }

            frontier = deduplicate_urls(&next, processed_urls);
            depth += 1;
        }
    }
}

/// Fetch one page and parse it; fetch failures are reported and yield `None`
async fn fetch_and_parse(
    parser: &dyn EventParser,
    url: &str,
    config: &ParserConfig,
    adapters: &HostAdapters,
) -> Option<(Vec<Event>, Vec<String>)> {
    let page = match adapters.http.fetch_data(url).await {
        Ok(page) => page,
        Err(e) => {
            let message = format!("Failed to fetch {}: {}", url, e);
            warn!("{}", message);
            adapters.display.log_warn(COMPONENT, &message);
            PipelineMetrics::record_fetch_error(&config.name);
            return None;
        }
    };

    let result = parser.parse_events(&page, config);
    PipelineMetrics::record_page_parsed(&config.name, result.events.len(), result.additional_links.len());
    let events = result
        .events
        .into_iter()
        .filter(|event| {
            let valid = event.is_valid();
            if !valid {
                warn!("Dropping event without title or source from {}", url);
            }
            valid
        })
        .map(|event| enrich_event_location(apply_field_merge_strategies(event, config), config))
        .collect();
    Some((events, result.additional_links))
}

fn is_unset(event: &Event, field: &str) -> bool {
    match event.field(field) {
        None => true,
        Some(value) => field == FIELD_CITY && value == UNKNOWN_CITY,
    }
}

/// Fold a detail-page event into the accumulated list.
///
/// A match on url, on the listing page's own url, or on trimmed title fills
/// the matched event's empty fields; otherwise the detail event is appended.
fn merge_detail_event(events: &mut Vec<Event>, detail: Event, page_url: &str, config: &ParserConfig) {
    let position = events.iter().position(|existing| {
        let same_url = match (existing.url.as_deref(), detail.url.as_deref()) {
            (Some(a), Some(b)) => a == b || a == page_url,
            (Some(a), None) => a == page_url,
            _ => false,
        };
        same_url || existing.title.trim() == detail.title.trim()
    });

    let Some(index) = position else {
        debug!("New event from detail page {}: {}", page_url, detail.title);
        events.push(detail);
        return;
    };

    let existing = &mut events[index];
    for field in detail.field_names() {
        if is_unset(existing, &field) {
            existing.set_field(&field, detail.field(&field));
        }
    }
    existing.is_bear_event |= detail.is_bear_event;
    for (field, strategy) in detail.field_merge_strategies {
        existing.field_merge_strategies.entry(field).or_insert(strategy);
    }
    let filled = std::mem::take(existing);
    *existing = enrich_event_location(filled, config);
    debug!("Enriched \"{}\" from detail page {}", existing.title, page_url);
}
