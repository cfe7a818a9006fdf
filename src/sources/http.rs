//! Thin JSON-over-HTTP client shared by the concrete sources.

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::EndpointConfig;
use crate::traits::SourceError;

#[derive(Debug, Clone)]
pub struct JsonClient {
    http: Client,
}

impl JsonClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(endpoints.request_timeout())
            .user_agent(endpoints.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self { http })
    }

    /// GETs `url` with `query` appended and decodes the body as `T`.
    #[instrument(skip(self, query))]
    pub async fn fetch_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!(bytes = body.len(), "Received response");

        decode(url, &body)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::Malformed {
        url: url.to_string(),
        message: e.to_string(),
    })
}
