use async_trait::async_trait;
use std::path::Path;
use tracing::{info, instrument};

use crate::traits::{OutputSink, SourceError};

/// Writes the document to the local filesystem, replacing any existing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

#[async_trait]
impl OutputSink for FileSink {
    #[instrument(skip(self, bytes), fields(path = %path.display(), bytes = bytes.len()))]
    async fn persist(&self, path: &Path, bytes: &[u8]) -> Result<(), SourceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        info!("Wrote effect map");
        Ok(())
    }
}
