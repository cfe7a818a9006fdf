use crate::model::{CatalogEntry, MatchResult, RelationshipResult};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether the failure happened before a usable body was received.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}

/// Upstream list of substances.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, SourceError>;
}

/// Resolves a free-text name to knowledge-base articles.
#[async_trait]
pub trait ArticleSearch: Send + Sync {
    async fn search_article(&self, name: &str) -> Result<MatchResult, SourceError>;
}

/// Queries the "has effect" relationships of a resolved name.
///
/// Returns the name it was asked about alongside the result, so callers never
/// have to correlate by position.
#[async_trait]
pub trait RelationshipQuery: Send + Sync {
    async fn query_relationships(
        &self,
        name: &str,
    ) -> Result<(String, RelationshipResult), SourceError>;
}

/// Destination for the serialized effect map.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Overwrites whatever is at `path`.
    async fn persist(&self, path: &Path, bytes: &[u8]) -> Result<(), SourceError>;
}

/// Per-stage progress display. Purely cosmetic: nothing here can fail.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str, total: usize) -> Box<dyn ProgressTick>;
}

pub trait ProgressTick: Send + Sync {
    fn tick(&self);

    fn finish(&self) {}
}
