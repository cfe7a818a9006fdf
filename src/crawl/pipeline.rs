//! Crawl pipeline orchestrator.
//!
//! This module provides the [`CrawlPipeline`] coordinator that runs the crawl
//! stages in order (Catalog → Names → Resolution → Effects → Persist) with:
//! - Async execution via `tokio`
//! - Bounded resolution waves and fan-out effect queries
//! - Structured logging via `tracing`
//! - All-or-nothing output: no file is written unless every stage succeeded

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::CrawlConfig;
use crate::crawl::effects::EffectExtractor;
use crate::crawl::names::NameExtractor;
use crate::crawl::resolver::BatchResolver;
use crate::crawl::traits::{CrawlStage, ExtractionError, ResolutionError};
use crate::model::EffectMap;
use crate::progress::NoProgress;
use crate::traits::{
    ArticleSearch, CatalogSource, OutputSink, ProgressReporter, RelationshipQuery, SourceError,
};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Everything one run produced, stage by stage.
#[derive(Debug)]
pub struct CrawlReport {
    /// Flattened catalog names, after truncation
    pub candidates: Vec<String>,

    /// Candidates that resolved to at least one article
    pub matched: Vec<String>,

    /// The persisted effect map
    pub effects: EffectMap,

    /// Where the effect map was written
    pub output_path: PathBuf,

    pub stats: CrawlStats,
}

/// Statistics about the crawl.
#[derive(Debug, Default, Clone)]
pub struct CrawlStats {
    /// Entries returned by the catalog source
    pub catalog_entries: usize,

    /// Names handed to the resolver
    pub candidates: usize,

    /// Names that resolved to an article
    pub matched: usize,

    /// Drugs present in the effect map
    pub drugs_with_effects: usize,

    /// Effect links across all drugs
    pub total_effects: usize,

    /// Time spent resolving names (milliseconds)
    pub resolution_duration_ms: u64,

    /// Time spent querying effects (milliseconds)
    pub extraction_duration_ms: u64,

    /// Time spent on the entire run (milliseconds)
    pub total_duration_ms: u64,

    /// Size of the persisted document
    pub bytes_written: usize,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that can end a crawl. Every one of them is raised before anything
/// is persisted, except [`PipelineError::Persist`] itself.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The catalog could not be fetched
    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// The catalog was fetched but is malformed or empty
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Resolution stage failed
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Effect extraction stage failed
    #[error("Effect extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The effect map could not be encoded
    #[error("Failed to serialize effect map: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The encoded effect map could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Crawl pipeline over injected collaborators.
///
/// 1. **Catalog**: fetch the substance catalog
/// 2. **Names**: flatten it into candidate names
/// 3. **Resolution**: keep names that match a wiki article
/// 4. **Effects**: query each match's effect relationships
/// 5. **Persist**: write the effect map as one JSON document
///
/// A pipeline holds only its collaborators and configuration; every run
/// starts from scratch and returns its intermediate results in the report.
///
/// # Example
///
/// ```ignore
/// use effect_harvester::crawl::CrawlPipeline;
/// use effect_harvester::sources::{FileSink, PsychonautWikiClient, TripsitCatalog};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let wiki = Arc::new(PsychonautWikiClient::new(&endpoints)?);
///     let pipeline = CrawlPipeline::new(catalog, wiki.clone(), wiki, FileSink)
///         .with_config(CrawlConfig::default().with_output_path("effects.json"));
///
///     let report = pipeline.run().await?;
///     println!("Done, saved to {}!", report.output_path.display());
///     Ok(())
/// }
/// ```
pub struct CrawlPipeline<C, S, Q, O>
where
    C: CatalogSource,
    S: ArticleSearch + ?Sized,
    Q: RelationshipQuery + ?Sized,
    O: OutputSink,
{
    catalog: C,

    search: Arc<S>,

    query: Arc<Q>,

    sink: O,

    config: CrawlConfig,

    progress: Arc<dyn ProgressReporter>,
}

impl<C, S, Q, O> CrawlPipeline<C, S, Q, O>
where
    C: CatalogSource,
    S: ArticleSearch + ?Sized,
    Q: RelationshipQuery + ?Sized,
    O: OutputSink,
{
    /// Creates a pipeline with the default [`CrawlConfig`] and no progress
    /// output.
    pub fn new(catalog: C, search: Arc<S>, query: Arc<Q>, sink: O) -> Self {
        Self {
            catalog,
            search,
            query,
            sink,
            config: CrawlConfig::default(),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs every stage once and persists the effect map.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any stage fails. Nothing is written in
    /// that case.
    #[instrument(skip(self), fields(output = %self.config.output_path.display()))]
    pub async fn run(&self) -> Result<CrawlReport, PipelineError> {
        let start = Instant::now();
        let mut stats = CrawlStats::default();

        // ====================================================================
        // Stage 1: Catalog
        // ====================================================================

        info!("Getting all catalog drugs..");
        let catalog = self.catalog.fetch_catalog().await.map_err(|e| {
            if e.is_unavailable() {
                PipelineError::SourceUnavailable(e)
            } else {
                PipelineError::InvalidCatalog(e.to_string())
            }
        })?;
        stats.catalog_entries = catalog.len();

        // ====================================================================
        // Stage 2: Names
        // ====================================================================

        let names = NameExtractor::new(self.config.max_names);
        let (candidates, _) = run_stage(&names, catalog)
            .await
            .map_err(|e| PipelineError::InvalidCatalog(e.to_string()))?;
        stats.candidates = candidates.len();

        // ====================================================================
        // Stage 3: Resolution
        // ====================================================================

        let resolver = BatchResolver::new(self.search.clone())
            .with_batch_size(self.config.batch_size)
            .with_progress(self.progress.clone());
        let (matched, elapsed_ms) = run_stage(&resolver, candidates.clone()).await?;
        stats.matched = matched.len();
        stats.resolution_duration_ms = elapsed_ms;

        // ====================================================================
        // Stage 4: Effects
        // ====================================================================

        let extractor = EffectExtractor::new(self.query.clone())
            .with_max_in_flight(self.config.effect_concurrency)
            .with_progress(self.progress.clone());
        let (effects, elapsed_ms) = run_stage(&extractor, matched.clone()).await?;
        stats.drugs_with_effects = effects.len();
        stats.total_effects = effects.values().map(|e| e.len()).sum();
        stats.extraction_duration_ms = elapsed_ms;

        // ====================================================================
        // Stage 5: Persist
        // ====================================================================

        let bytes = self.encode(&effects)?;
        let output_path = self.config.output_path.clone();
        self.sink
            .persist(&output_path, &bytes)
            .await
            .map_err(|source| PipelineError::Persist {
                path: output_path.clone(),
                source,
            })?;
        stats.bytes_written = bytes.len();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            candidates = stats.candidates,
            matched = stats.matched,
            drugs = stats.drugs_with_effects,
            effects = stats.total_effects,
            bytes = stats.bytes_written,
            duration_ms = stats.total_duration_ms,
            "Crawl completed"
        );

        Ok(CrawlReport {
            candidates,
            matched,
            effects,
            output_path,
            stats,
        })
    }

    fn encode(&self, effects: &EffectMap) -> Result<Vec<u8>, serde_json::Error> {
        if self.config.pretty {
            serde_json::to_vec_pretty(effects)
        } else {
            serde_json::to_vec(effects)
        }
    }
}

/// Runs one stage through [`CrawlStage::execute`], returning its output and
/// the elapsed milliseconds.
async fn run_stage<T: CrawlStage>(
    stage: &T,
    input: T::Input,
) -> Result<(T::Output, u64), T::Error> {
    let started = Instant::now();
    info!(stage = stage.stage_name(), "Starting stage");

    let output = stage.execute(input).await?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!(stage = stage.stage_name(), elapsed_ms, "Stage finished");
    Ok((output, elapsed_ms))
}

// ============================================================================
// Tests
// ============================================================================
