use async_trait::async_trait;
use tracing::info;

use crate::crawl::traits::{CatalogError, CrawlStage};
use crate::model::CatalogEntry;

/// Default cap on candidate names handed to the resolver.
pub const DEFAULT_MAX_NAMES: usize = 150;

/// Flattens catalog entries into candidate names: each entry's name followed
/// by its aliases, in catalog order, truncated to `max_names`.
#[derive(Debug, Clone)]
pub struct NameExtractor {
    max_names: usize,
}

impl Default for NameExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAMES)
    }
}

impl NameExtractor {
    pub fn new(max_names: usize) -> Self {
        Self { max_names }
    }

    pub fn max_names(&self) -> usize {
        self.max_names
    }

    pub fn extract(&self, catalog: &[CatalogEntry]) -> Result<Vec<String>, CatalogError> {
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }

        let names: Vec<String> = catalog
            .iter()
            .flat_map(|entry| std::iter::once(&entry.name).chain(entry.aliases.iter()))
            .take(self.max_names)
            .cloned()
            .collect();

        info!(
            entries = catalog.len(),
            candidates = names.len(),
            max_names = self.max_names,
            "Extracted candidate names"
        );

        Ok(names)
    }
}

#[async_trait]
impl CrawlStage for NameExtractor {
    type Input = Vec<CatalogEntry>;
    type Output = Vec<String>;
    type Error = CatalogError;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.extract(&input)
    }

    fn stage_name(&self) -> &'static str {
        "Extracting candidate names"
    }
}
