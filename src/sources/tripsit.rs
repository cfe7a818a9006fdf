use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::EndpointConfig;
use crate::model::CatalogEntry;
use crate::sources::http::JsonClient;
use crate::traits::{CatalogSource, SourceError};

/// TripSit's drug list.
///
/// The endpoint answers `{ "data": [ { "<drug>": { "name", "aliases", .. }, .. } ] }`;
/// only the first element of `data` is the catalog.
#[derive(Debug, Clone)]
pub struct TripsitCatalog {
    client: JsonClient,
    url: String,
}

#[derive(Deserialize)]
struct AllDrugsResponse {
    #[serde(default)]
    data: Value,
}

impl TripsitCatalog {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: JsonClient::new(endpoints)?,
            url: endpoints.catalog_url.clone(),
        })
    }
}

#[async_trait]
impl CatalogSource for TripsitCatalog {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, SourceError> {
        let response: AllDrugsResponse = self.client.fetch_json(&self.url, &[]).await?;
        let entries = parse_catalog(&self.url, response.data)?;
        info!(entries = entries.len(), "Fetched catalog");
        Ok(entries)
    }
}

fn parse_catalog(url: &str, data: Value) -> Result<Vec<CatalogEntry>, SourceError> {
    let malformed = |message: String| SourceError::Malformed {
        url: url.to_string(),
        message,
    };

    let first = match data {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| malformed("catalog list should not be empty".to_string()))?,
        _ => return Err(malformed("catalog list should be an array".to_string())),
    };

    // Entries are keyed by drug name; document order is kept.
    let entries: Vec<Value> = match first {
        Value::Object(map) => map.into_iter().map(|(_, entry)| entry).collect(),
        Value::Array(items) => items,
        _ => return Err(malformed("catalog should be an object of drugs".to_string())),
    };

    entries
        .into_iter()
        .map(|entry| CatalogEntry::deserialize(entry).map_err(|e| malformed(e.to_string())))
        .collect()
}
