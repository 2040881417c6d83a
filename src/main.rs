use anyhow::{Context, Result};
use bear_event_scraper::app::ports::HostAdapters;
use bear_event_scraper::config::{ParserConfig, ScraperConfig};
use bear_event_scraper::infra::{JsonCalendarStore, ReqwestHttp, TracingDisplay};
use bear_event_scraper::logging;
use bear_event_scraper::parsers::ParserRegistry;
use bear_event_scraper::pipeline::SharedCore;
use bear_event_scraper::types::HtmlPage;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bear_event_scraper")]
#[command(about = "Bear event scraper: parse, filter, dedup and merge events into a calendar")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured parser job
    Run {
        /// Config file (defaults to $BEAR_SCRAPER_CONFIG, then scraper.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Parse and filter but do not write the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one parser over a saved page and print the events as JSON
    ParseFile {
        #[arg(long)]
        parser: String,
        #[arg(long)]
        file: PathBuf,
        /// URL the page was saved from; relative links resolve against it
        #[arg(long)]
        url: String,
    },
    /// List registered parsers
    ListParsers,
}

async fn run(config_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let config = ScraperConfig::load(config_path.as_deref()).context("loading scraper config")?;
    let dry_run = dry_run || config.dry_run;
    info!("🚀 Running {} job(s){}", config.parsers.len(), if dry_run { " (dry run)" } else { "" });

    let registry = ParserRegistry::with_defaults();
    let adapters = HostAdapters::new(
        Arc::new(ReqwestHttp::new()),
        Arc::new(TracingDisplay),
        Arc::new(JsonCalendarStore::new(config.calendar_path.clone())),
    );
    let core = SharedCore::new(dry_run);
    let results = core.process_events(&config.parsers, &adapters, &registry).await;

    println!("\n📊 Results:");
    for run in &results.parser_results {
        println!(
            "   {} ({}): {} found, {} kept, {} added, {} url(s)",
            run.name, run.parser, run.total_events, run.bear_events, run.calendar_events, run.urls_processed
        );
    }
    println!("   Total events: {}", results.total_events);
    println!("   Bear events: {}", results.bear_events);
    println!("   Added to calendar: {}", results.calendar_events);

    if !results.errors.is_empty() {
        warn!("{} job(s) failed", results.errors.len());
        println!("\n⚠️  Errors encountered:");
        for error in &results.errors {
            println!("   - {}", error);
        }
    }
    Ok(())
}

fn parse_file(parser_name: &str, file: &Path, url: &str) -> Result<()> {
    let registry = ParserRegistry::with_defaults();
    let parser = registry
        .get(parser_name)
        .with_context(|| format!("unknown parser '{}'; try list-parsers", parser_name))?;
    let html = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let config = ParserConfig::new("parse-file", parser_name, vec![url.to_string()]);
    let result = parser.parse_events(&HtmlPage::new(html, url), &config);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, dry_run } => run(config, dry_run).await?,
        Commands::ParseFile { parser, file, url } => parse_file(&parser, &file, &url)?,
        Commands::ListParsers => {
            for name in ParserRegistry::with_defaults().list_parsers() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
