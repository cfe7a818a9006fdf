use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::EndpointConfig;
use crate::model::{MatchResult, RelationshipResult};
use crate::sources::http::JsonClient;
use crate::traits::{ArticleSearch, RelationshipQuery, SourceError};

/// Main article namespace.
const ARTICLE_NAMESPACE: &str = "0";

/// Semantic property linking an effect page to the substances that cause it.
const EFFECT_PROPERTY: &str = "Effect";

/// PsychonautWiki's MediaWiki API: `opensearch` for name resolution and the
/// Semantic MediaWiki `ask` action for effect relationships.
#[derive(Debug, Clone)]
pub struct PsychonautWikiClient {
    client: JsonClient,
    api_url: String,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    query: RelationshipResult,
}

impl PsychonautWikiClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: JsonClient::new(endpoints)?,
            api_url: endpoints.wiki_api_url.clone(),
        })
    }
}

/// `[[-Effect::<name>]]`: pages whose effect property points back at `name`.
fn effect_query(name: &str) -> String {
    format!("[[-{}::{}]]", EFFECT_PROPERTY, name)
}

#[async_trait]
impl ArticleSearch for PsychonautWikiClient {
    #[instrument(skip(self))]
    async fn search_article(&self, name: &str) -> Result<MatchResult, SourceError> {
        let body: Value = self
            .client
            .fetch_json(
                &self.api_url,
                &[
                    ("action", "opensearch"),
                    ("search", name),
                    ("limit", "1"),
                    ("namespace", ARTICLE_NAMESPACE),
                    ("format", "json"),
                ],
            )
            .await?;

        let result = parse_opensearch(&self.api_url, name, body)?;
        debug!(term = %result.term, matches = result.matches.len(), "Search answered");
        Ok(result)
    }
}

#[async_trait]
impl RelationshipQuery for PsychonautWikiClient {
    #[instrument(skip(self))]
    async fn query_relationships(
        &self,
        name: &str,
    ) -> Result<(String, RelationshipResult), SourceError> {
        let query = effect_query(name);
        let response: AskResponse = self
            .client
            .fetch_json(
                &self.api_url,
                &[("action", "ask"), ("format", "json"), ("query", query.as_str())],
            )
            .await?;

        Ok((name.to_string(), response.query))
    }
}

/// Opensearch answers `[term, [titles], [descriptions], [urls]]`. The echoed
/// term is what gets recorded; the requested name stands in if it is missing.
fn parse_opensearch(url: &str, requested: &str, body: Value) -> Result<MatchResult, SourceError> {
    let mut parts = match body {
        Value::Array(parts) => parts.into_iter(),
        other => {
            return Err(SourceError::Malformed {
                url: url.to_string(),
                message: format!("expected opensearch array, got {}", other),
            })
        }
    };

    let term = match parts.next() {
        Some(Value::String(term)) => term,
        _ => requested.to_string(),
    };

    let matches = match parts.next() {
        Some(Value::Array(titles)) => titles
            .into_iter()
            .filter_map(|title| match title {
                Value::String(title) => Some(title),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(MatchResult { term, matches })
}
