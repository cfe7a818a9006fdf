//! Stage abstraction and stage-level errors for the crawl pipeline.

use crate::executor::ExecutorError;
use crate::traits::SourceError;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Stage Trait
// ============================================================================

/// One step of the crawl: consumes the previous stage's output and produces
/// the next stage's input.
///
/// # Examples
///
/// ```ignore
/// struct Uppercase;
///
/// #[async_trait]
/// impl CrawlStage for Uppercase {
///     type Input = Vec<String>;
///     type Output = Vec<String>;
///     type Error = std::convert::Infallible;
///
///     async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
///         Ok(input.into_iter().map(|s| s.to_uppercase()).collect())
///     }
///
///     fn stage_name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
#[async_trait]
pub trait CrawlStage: Send + Sync {
    type Input: Send;

    type Output;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the stage to completion. Stages either produce their whole output
    /// or fail; there is no partial result.
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Used as the progress label and in log fields.
    fn stage_name(&self) -> &'static str;
}

// ============================================================================
// Error Types
// ============================================================================

/// The catalog could not be turned into candidate names.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog is empty")]
    Empty,
}

/// Errors from resolving candidate names to articles.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Nothing to resolve
    #[error("No candidate names to resolve")]
    EmptyInput,

    /// A single lookup failed, which fails the whole stage
    #[error("Article lookup for '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Errors from querying effect relationships.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A single relationship query failed, which fails the whole stage
    #[error("Effect query for '{name}' failed: {source}")]
    Query {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
