//! Run configuration.
//!
//! [`CrawlConfig`] drives the pipeline itself; [`EndpointConfig`] only the
//! HTTP collaborators. Both deserialize from partial documents, falling back
//! to the defaults for anything left out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::crawl::names::DEFAULT_MAX_NAMES;
use crate::crawl::resolver::DEFAULT_BATCH_SIZE;

pub const DEFAULT_OUTPUT_PATH: &str = "./elist.json";
pub const DEFAULT_CATALOG_URL: &str = "http://tripbot.tripsit.me/api/tripsit/getAllDrugs";
pub const DEFAULT_WIKI_API_URL: &str = "https://psychonautwiki.org/w/api.php";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Where the effect map is written
    pub output_path: PathBuf,

    /// Cap on candidate names taken from the catalog
    pub max_names: usize,

    /// Lookups per resolution wave
    pub batch_size: usize,

    /// Cap on concurrent effect queries (`None`: all at once)
    pub effect_concurrency: Option<usize>,

    /// Pretty-print the output document
    pub pretty: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            max_names: DEFAULT_MAX_NAMES,
            batch_size: DEFAULT_BATCH_SIZE,
            effect_concurrency: None,
            pretty: false,
        }
    }
}

impl CrawlConfig {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_max_names(mut self, max_names: usize) -> Self {
        self.max_names = max_names;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_effect_concurrency(mut self, limit: Option<usize>) -> Self {
        self.effect_concurrency = limit;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub catalog_url: String,
    pub wiki_api_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            wiki_api_url: DEFAULT_WIKI_API_URL.to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("effect-harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
