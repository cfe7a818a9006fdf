use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("Semaphore error: {0}")]
    Semaphore(String),
}

/// Runs one async operation per item on the calling task and joins them all.
///
/// Unbounded by default; [`WaveExecutor::bounded`] gates every operation on a
/// semaphore permit so at most `limit` are in flight at once. The first error
/// wins and the remaining operations are dropped.
#[derive(Debug, Clone, Default)]
pub struct WaveExecutor {
    semaphore: Option<Arc<Semaphore>>,
    limit: Option<usize>,
}

impl WaveExecutor {
    pub fn new() -> Self {
        Self {
            semaphore: None,
            limit: None,
        }
    }

    pub fn bounded(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Some(Arc::new(Semaphore::new(limit))),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Outputs come back in item order, whatever order they completed in.
    #[instrument(skip_all, fields(bounded = self.semaphore.is_some()))]
    pub async fn run_wave<I, T, E, F, Fut>(&self, items: I, op: F) -> Result<Vec<T>, E>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ExecutorError>,
    {
        let tasks: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = self.semaphore.clone();
                let task = op(item);
                async move {
                    let _permit = match &semaphore {
                        Some(s) => match s.acquire().await {
                            Ok(permit) => Some(permit),
                            Err(e) => return Err(E::from(ExecutorError::Semaphore(e.to_string()))),
                        },
                        None => None,
                    };
                    task.await
                }
            })
            .collect();

        debug!(tasks = tasks.len(), "Dispatching wave");
        let outputs = try_join_all(tasks).await?;
        debug!(completed = outputs.len(), "Wave settled");

        Ok(outputs)
    }
}
