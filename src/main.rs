//! effect-harvester
//!
//! Resolves TripSit drug names against PsychonautWiki and writes every
//! matched drug's effects to one JSON file.
//!
//! Usage:
//!   effect-harvester --output elist.json --batch-size 5
//!
//! Logging follows `RUST_LOG` (default `effect_harvester=info`); per-request
//! progress shows up at `debug`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use effect_harvester::config::{
    CrawlConfig, EndpointConfig, DEFAULT_CATALOG_URL, DEFAULT_OUTPUT_PATH, DEFAULT_WIKI_API_URL,
};
use effect_harvester::crawl::{CrawlPipeline, DEFAULT_BATCH_SIZE, DEFAULT_MAX_NAMES};
use effect_harvester::progress::LogProgress;
use effect_harvester::sources::{FileSink, PsychonautWikiClient, TripsitCatalog};

/// Harvest substance effects from PsychonautWiki
#[derive(Parser, Debug)]
#[command(name = "effect-harvester", version)]
#[command(about = "Map TripSit drug names to PsychonautWiki effects")]
struct Args {
    /// File the effect map is written to (overwritten)
    #[arg(long, short = 'o', env = "EFFECT_HARVESTER_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Maximum number of candidate names taken from the catalog
    #[arg(long, env = "EFFECT_HARVESTER_MAX_NAMES", default_value_t = DEFAULT_MAX_NAMES)]
    max_names: usize,

    /// Article lookups per wave; keep it small to spare the wiki
    #[arg(long, short = 'b', env = "EFFECT_HARVESTER_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Cap on simultaneous effect queries (default: all at once)
    #[arg(long, env = "EFFECT_HARVESTER_EFFECT_CONCURRENCY")]
    effect_concurrency: Option<usize>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,

    /// TripSit all-drugs endpoint
    #[arg(long, env = "EFFECT_HARVESTER_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,

    /// PsychonautWiki API endpoint
    #[arg(long, env = "EFFECT_HARVESTER_WIKI_API_URL", default_value = DEFAULT_WIKI_API_URL)]
    wiki_api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "EFFECT_HARVESTER_TIMEOUT", default_value_t = 30)]
    timeout: u64,
}

impl Args {
    fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::default()
            .with_output_path(self.output.clone())
            .with_max_names(self.max_names)
            .with_batch_size(self.batch_size)
            .with_effect_concurrency(self.effect_concurrency)
            .with_pretty(self.pretty)
    }

    fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            catalog_url: self.catalog_url.clone(),
            wiki_api_url: self.wiki_api_url.clone(),
            request_timeout_secs: self.timeout,
            ..EndpointConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "effect_harvester=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(path) => {
            println!("Done, saved to {}!", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Crawl failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<PathBuf, Box<dyn std::error::Error>> {
    println!("Running..");

    let endpoints = args.endpoint_config();
    let catalog = TripsitCatalog::new(&endpoints)?;
    let wiki = Arc::new(PsychonautWikiClient::new(&endpoints)?);

    let pipeline = CrawlPipeline::new(catalog, wiki.clone(), wiki, FileSink)
        .with_config(args.crawl_config())
        .with_progress(Arc::new(LogProgress));

    let report = pipeline.run().await?;
    Ok(report.output_path)
}
