use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::crawl::traits::{CrawlStage, ResolutionError};
use crate::executor::WaveExecutor;
use crate::model::MatchResult;
use crate::progress::NoProgress;
use crate::traits::{ArticleSearch, ProgressReporter};

/// Default wave size. Keeps the load on the wiki down to a handful of
/// simultaneous requests.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Resolves candidate names to wiki articles in sequential waves of
/// `batch_size` concurrent lookups.
pub struct BatchResolver<S: ArticleSearch + ?Sized> {
    search: Arc<S>,
    batch_size: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl<S: ArticleSearch + ?Sized> BatchResolver<S> {
    pub fn new(search: Arc<S>) -> Self {
        Self {
            search,
            batch_size: DEFAULT_BATCH_SIZE,
            progress: Arc::new(NoProgress),
        }
    }

    /// A batch size of zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the names that matched at least one article, wave by wave.
    ///
    /// Each wave is fully settled before the next one is dispatched, so no
    /// more than `batch_size` lookups are ever outstanding. Any failed lookup
    /// fails the whole resolution.
    #[instrument(skip_all, fields(names = names.len(), batch_size = self.batch_size))]
    pub async fn resolve(&self, names: &[String]) -> Result<Vec<String>, ResolutionError> {
        if names.is_empty() {
            return Err(ResolutionError::EmptyInput);
        }

        let progress = self.progress.start(self.stage_name(), names.len());
        let executor = WaveExecutor::new();
        let mut matched = Vec::new();

        for (wave, chunk) in names.chunks(self.batch_size).enumerate() {
            let results = executor
                .run_wave(chunk, |name| {
                    let progress = &progress;
                    async move {
                        let result = self.search.search_article(name).await.map_err(|source| {
                            ResolutionError::Lookup {
                                name: name.clone(),
                                source,
                            }
                        })?;
                        progress.tick();
                        Ok::<_, ResolutionError>(result)
                    }
                })
                .await?;

            let before = matched.len();
            // The echoed term travels with each result; position in the wave
            // is never used to recover the name.
            matched.extend(
                results
                    .into_iter()
                    .filter(MatchResult::is_match)
                    .map(|result| result.term),
            );
            debug!(
                wave,
                size = chunk.len(),
                matched = matched.len() - before,
                "Resolution wave settled"
            );
        }

        progress.finish();
        info!(
            candidates = names.len(),
            matched = matched.len(),
            "Resolved names to articles"
        );

        Ok(matched)
    }
}

#[async_trait]
impl<S: ArticleSearch + ?Sized> CrawlStage for BatchResolver<S> {
    type Input = Vec<String>;
    type Output = Vec<String>;
    type Error = ResolutionError;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.resolve(&input).await
    }

    fn stage_name(&self) -> &'static str {
        "Resolving to PsychonautWiki articles"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::InFlight;
    use crate::progress::CountingProgress;
    use crate::traits::SourceError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mock search: matches only the configured names. Longer names resolve
    // sooner so completion order differs from dispatch order.
    struct MockSearch {
        known: HashSet<String>,
        failing: Option<String>,
        in_flight: InFlight,
        calls: Mutex<Vec<String>>,
    }

    impl MockSearch {
        fn new(known: &[&str]) -> Self {
            Self {
                known: known.iter().map(|s| s.to_string()).collect(),
                failing: None,
                in_flight: InFlight::default(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, name: &str) -> Self {
            self.failing = Some(name.to_string());
            self
        }
    }

    #[async_trait]
    impl ArticleSearch for MockSearch {
        async fn search_article(&self, name: &str) -> Result<MatchResult, SourceError> {
            self.calls.lock().unwrap().push(name.to_string());
            let delay = 20u64.saturating_sub(name.len() as u64 * 2);
            self.in_flight
                .track(tokio::time::sleep(Duration::from_millis(delay)))
                .await;

            if self.failing.as_deref() == Some(name) {
                return Err(SourceError::Transport {
                    url: "http://wiki/api.php".to_string(),
                    message: "connection reset".to_string(),
                });
            }

            let matches = if self.known.contains(name) {
                vec![name.to_string()]
            } else {
                vec![]
            };
            Ok(MatchResult {
                term: name.to_string(),
                matches,
            })
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_keeps_only_matched_names_in_order() {
        let search = Arc::new(MockSearch::new(&["A", "B"]));
        let resolver = BatchResolver::new(search).with_batch_size(5);

        let matched = resolver.resolve(&names(&["A", "A1", "B"])).await.unwrap();
        assert_eq!(matched, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_never_exceeds_batch_size_in_flight() {
        let candidates: Vec<String> = (0..23).map(|i| format!("n{i}")).collect();
        let search = Arc::new(MockSearch::new(&[]));
        let resolver = BatchResolver::new(search.clone()).with_batch_size(5);

        resolver.resolve(&candidates).await.unwrap();

        assert_eq!(search.in_flight.peak(), 5);
        assert_eq!(search.calls.lock().unwrap().len(), 23);
    }

    #[tokio::test]
    async fn test_waves_are_dispatched_sequentially() {
        let candidates = names(&["a", "bb", "ccc", "dddd", "eeeee"]);
        let search = Arc::new(MockSearch::new(&[]));
        let resolver = BatchResolver::new(search.clone()).with_batch_size(2);

        resolver.resolve(&candidates).await.unwrap();

        let calls = search.calls.lock().unwrap().clone();
        // Within a wave dispatch order is free; across waves it is fixed.
        let wave_of = |name: &str| candidates.iter().position(|c| c == name).unwrap() / 2;
        let waves: Vec<usize> = calls.iter().map(|c| wave_of(c.as_str())).collect();
        let mut sorted = waves.clone();
        sorted.sort();
        assert_eq!(waves, sorted);
        assert!(search.in_flight.peak() <= 2);
    }

    #[tokio::test]
    async fn test_output_is_ordered_subset_of_input() {
        let candidates = names(&["ketamine", "k", "lsd", "acid", "dmt", "2c-b", "nexus"]);
        let search = Arc::new(MockSearch::new(&["ketamine", "lsd", "dmt", "2c-b"]));
        let resolver = BatchResolver::new(search).with_batch_size(3);

        let matched = resolver.resolve(&candidates).await.unwrap();
        assert_eq!(matched, vec!["ketamine", "lsd", "dmt", "2c-b"]);

        let mut positions = matched
            .iter()
            .map(|m| candidates.iter().position(|c| c == m).unwrap());
        let mut last = positions.next().unwrap();
        for p in positions {
            assert!(p > last);
            last = p;
        }
    }

    #[tokio::test]
    async fn test_duplicate_matches_propagate() {
        let search = Arc::new(MockSearch::new(&["mdma"]));
        let resolver = BatchResolver::new(search);

        let matched = resolver
            .resolve(&names(&["mdma", "molly", "mdma"]))
            .await
            .unwrap();
        assert_eq!(matched, vec!["mdma", "mdma"]);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let resolver = BatchResolver::new(Arc::new(MockSearch::new(&[])));
        let err = resolver.resolve(&[]).await.unwrap_err();
        assert!(matches!(err, ResolutionError::EmptyInput));
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_stage() {
        let search = Arc::new(MockSearch::new(&["A", "B"]).failing_on("A1"));
        let resolver = BatchResolver::new(search);

        let err = resolver
            .resolve(&names(&["A", "A1", "B"]))
            .await
            .unwrap_err();
        match err {
            ResolutionError::Lookup { name, .. } => assert_eq!(name, "A1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ticks_once_per_lookup() {
        let progress = CountingProgress::new();
        let resolver = BatchResolver::new(Arc::new(MockSearch::new(&["x"])))
            .with_batch_size(2)
            .with_progress(Arc::new(progress.clone()));

        resolver
            .resolve(&names(&["x", "y", "z", "w", "v"]))
            .await
            .unwrap();

        assert_eq!(progress.ticks(resolver.stage_name()), 5);
    }

    #[tokio::test]
    async fn test_execute_resolves_owned_names() {
        let resolver = BatchResolver::new(Arc::new(MockSearch::new(&["A", "B"])));

        let matched = resolver.execute(names(&["A", "A1", "B"])).await.unwrap();
        assert_eq!(matched, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_input() {
        let resolver = BatchResolver::new(Arc::new(MockSearch::new(&[])));
        let err = resolver.execute(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ResolutionError::EmptyInput));
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let resolver = BatchResolver::new(Arc::new(MockSearch::new(&[]))).with_batch_size(0);
        assert_eq!(resolver.batch_size(), 1);
    }
}
