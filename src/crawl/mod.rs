//! Crawl module - the catalog → article → effect resolution pipeline.
//!
//! - **Stages**: [`NameExtractor`], [`BatchResolver`], [`EffectExtractor`], all
//!   implementing [`CrawlStage`]
//! - **Errors**: one error type per stage, wrapped by [`PipelineError`]
//! - **Pipeline**: async orchestrator via [`pipeline::CrawlPipeline`]

pub mod effects;
pub mod names;
pub mod pipeline;
pub mod resolver;
pub mod traits;

pub use traits::{CatalogError, CrawlStage, ExtractionError, ResolutionError};

pub use effects::EffectExtractor;
pub use names::{NameExtractor, DEFAULT_MAX_NAMES};
pub use pipeline::{CrawlPipeline, CrawlReport, CrawlStats, PipelineError};
pub use resolver::{BatchResolver, DEFAULT_BATCH_SIZE};
