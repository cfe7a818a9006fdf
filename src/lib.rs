pub mod config;
pub mod crawl;
pub mod executor;
pub mod model;
pub mod progress;
pub mod sources;
pub mod traits;

// Re-export common types for convenience
pub use config::{CrawlConfig, EndpointConfig};
pub use crawl::{CrawlPipeline, CrawlReport, PipelineError};
pub use executor::*;
pub use model::*;
pub use traits::*;
