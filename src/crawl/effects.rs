use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::crawl::traits::{CrawlStage, ExtractionError};
use crate::executor::WaveExecutor;
use crate::model::EffectMap;
use crate::progress::NoProgress;
use crate::traits::{ProgressReporter, RelationshipQuery};

/// Queries the effect relationships of every matched name at once and folds
/// the answers into an [`EffectMap`].
pub struct EffectExtractor<Q: RelationshipQuery + ?Sized> {
    query: Arc<Q>,
    executor: WaveExecutor,
    progress: Arc<dyn ProgressReporter>,
}

impl<Q: RelationshipQuery + ?Sized> EffectExtractor<Q> {
    pub fn new(query: Arc<Q>) -> Self {
        Self {
            query,
            executor: WaveExecutor::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Caps the number of outstanding queries. `None` sends them all at once.
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.executor = match limit {
            Some(limit) => WaveExecutor::bounded(limit),
            None => WaveExecutor::new(),
        };
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.executor.limit()
    }

    /// Names whose query came back without results are left out of the map.
    /// A name with results but no usable URLs maps to an empty entry.
    /// A repeated name keeps the last answer.
    #[instrument(skip_all, fields(names = matched.len(), max_in_flight = ?self.max_in_flight()))]
    pub async fn extract(&self, matched: &[String]) -> Result<EffectMap, ExtractionError> {
        if matched.is_empty() {
            warn!("No matched names, effect map will be empty");
        }

        let progress = self.progress.start(self.stage_name(), matched.len());

        let answers = self
            .executor
            .run_wave(matched, |name| {
                let progress = &progress;
                async move {
                    let answer = self.query.query_relationships(name).await.map_err(|source| {
                        ExtractionError::Query {
                            name: name.clone(),
                            source,
                        }
                    })?;
                    progress.tick();
                    Ok::<_, ExtractionError>(answer)
                }
            })
            .await?;

        let mut effects = EffectMap::new();
        for (name, result) in answers {
            if let Some(entry) = result.into_entry() {
                effects.insert(name, entry);
            }
        }

        progress.finish();
        info!(
            queried = matched.len(),
            drugs_with_effects = effects.len(),
            total_effects = effects.values().map(|e| e.len()).sum::<usize>(),
            "Extracted effects"
        );

        Ok(effects)
    }
}

#[async_trait]
impl<Q: RelationshipQuery + ?Sized> CrawlStage for EffectExtractor<Q> {
    type Input = Vec<String>;
    type Output = EffectMap;
    type Error = ExtractionError;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.extract(&input).await
    }

    fn stage_name(&self) -> &'static str {
        "Extracting effects"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::InFlight;
    use crate::model::{EffectLink, RelationshipResult};
    use crate::progress::CountingProgress;
    use crate::traits::SourceError;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct MockQuery {
        answers: HashMap<String, RelationshipResult>,
        failing: Option<String>,
        in_flight: InFlight,
    }

    impl MockQuery {
        fn answer(mut self, name: &str, effects: &[(&str, &str)]) -> Self {
            let result = RelationshipResult::with_results(
                effects
                    .iter()
                    .map(|(effect, url)| (effect.to_string(), EffectLink::new(*url))),
            );
            self.answers.insert(name.to_string(), result);
            self
        }
    }

    #[async_trait]
    impl RelationshipQuery for MockQuery {
        async fn query_relationships(
            &self,
            name: &str,
        ) -> Result<(String, RelationshipResult), SourceError> {
            self.in_flight
                .track(tokio::time::sleep(Duration::from_millis(5)))
                .await;

            if self.failing.as_deref() == Some(name) {
                return Err(SourceError::Malformed {
                    url: "http://wiki/api.php".to_string(),
                    message: "expected value at line 1 column 1".to_string(),
                });
            }

            let result = self.answers.get(name).cloned().unwrap_or_default();
            Ok((name.to_string(), result))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_names_without_results_are_omitted() {
        let query = MockQuery::default().answer("A", &[("euphoria", "http://x/euphoria")]);
        let extractor = EffectExtractor::new(Arc::new(query));

        let effects = extractor.extract(&names(&["A", "B"])).await.unwrap();

        let json = serde_json::to_string(&effects).unwrap();
        assert_eq!(json, r#"{"A":{"euphoria":"http://x/euphoria"}}"#);
    }

    #[tokio::test]
    async fn test_entry_mirrors_every_result() {
        let query = MockQuery::default().answer(
            "LSD",
            &[
                ("Euphoria", "https://psychonautwiki.org/wiki/Euphoria"),
                ("Time distortion", "https://psychonautwiki.org/wiki/Time_distortion"),
                ("Geometry", "https://psychonautwiki.org/wiki/Geometry"),
            ],
        );
        let extractor = EffectExtractor::new(Arc::new(query));

        let effects = extractor.extract(&names(&["LSD"])).await.unwrap();
        let entry = &effects["LSD"];

        assert_eq!(entry.len(), 3);
        assert_eq!(
            entry["Time distortion"],
            "https://psychonautwiki.org/wiki/Time_distortion"
        );
    }

    #[tokio::test]
    async fn test_empty_results_object_is_omitted() {
        let mut query = MockQuery::default();
        let empty = RelationshipResult::with_results(Vec::<(String, EffectLink)>::new());
        query.answers.insert("DXM".to_string(), empty);
        let extractor = EffectExtractor::new(Arc::new(query));

        let effects = extractor.extract(&names(&["DXM"])).await.unwrap();
        assert!(effects.is_empty());
    }

    #[tokio::test]
    async fn test_results_without_urls_keep_the_drug() {
        let mut query = MockQuery::default();
        let bare = RelationshipResult::with_results([("Sedation", EffectLink { fullurl: None })]);
        query.answers.insert("X".to_string(), bare);
        let extractor = EffectExtractor::new(Arc::new(query));

        let effects = extractor.extract(&names(&["X"])).await.unwrap();

        let json = serde_json::to_string(&effects).unwrap();
        assert_eq!(json, r#"{"X":{}}"#);
    }

    #[tokio::test]
    async fn test_execute_takes_owned_names() {
        let query = MockQuery::default().answer("A", &[("euphoria", "http://x/euphoria")]);
        let extractor = EffectExtractor::new(Arc::new(query));

        let effects = extractor.execute(names(&["A", "B"])).await.unwrap();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects["A"]["euphoria"], "http://x/euphoria");
    }

    #[tokio::test]
    async fn test_fans_out_to_every_name_by_default() {
        let query = Arc::new(MockQuery::default());
        let extractor = EffectExtractor::new(query.clone());
        let candidates: Vec<String> = (0..12).map(|i| format!("d{i}")).collect();

        extractor.extract(&candidates).await.unwrap();
        assert_eq!(query.in_flight.peak(), 12);
    }

    #[tokio::test]
    async fn test_max_in_flight_caps_fan_out() {
        let query = Arc::new(MockQuery::default());
        let extractor = EffectExtractor::new(query.clone()).with_max_in_flight(Some(4));
        let candidates: Vec<String> = (0..12).map(|i| format!("d{i}")).collect();

        extractor.extract(&candidates).await.unwrap();
        assert!(query.in_flight.peak() <= 4);
    }

    #[tokio::test]
    async fn test_single_failure_aborts_extraction() {
        let mut query = MockQuery::default().answer("A", &[("euphoria", "http://x/euphoria")]);
        query.failing = Some("B".to_string());
        let extractor = EffectExtractor::new(Arc::new(query));

        let err = extractor.extract(&names(&["A", "B"])).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Query { ref name, .. } if name == "B"));
    }

    #[tokio::test]
    async fn test_ticks_once_per_query() {
        let progress = CountingProgress::new();
        let query = MockQuery::default().answer("A", &[("euphoria", "http://x/euphoria")]);
        let extractor =
            EffectExtractor::new(Arc::new(query)).with_progress(Arc::new(progress.clone()));

        extractor.extract(&names(&["A", "B", "C"])).await.unwrap();
        assert_eq!(progress.ticks(extractor.stage_name()), 3);
    }

    #[tokio::test]
    async fn test_empty_input_gives_empty_map() {
        let extractor = EffectExtractor::new(Arc::new(MockQuery::default()));
        let effects = extractor.extract(&[]).await.unwrap();
        assert!(effects.is_empty());
    }
}
