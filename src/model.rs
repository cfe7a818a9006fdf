use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One substance as listed by the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Outcome of a single article search: the term the service echoed back and
/// the matching article titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub term: String,
    pub matches: Vec<String>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// A single effect link returned by the relationship query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectLink {
    #[serde(default)]
    pub fullurl: Option<String>,
}

impl EffectLink {
    pub fn new(fullurl: impl Into<String>) -> Self {
        Self {
            fullurl: Some(fullurl.into()),
        }
    }
}

/// Body of a relationship query. `results` is `None` when the service
/// reported nothing, including the empty-array encoding Semantic MediaWiki
/// uses for an empty result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipResult {
    #[serde(default, deserialize_with = "object_or_none")]
    pub results: Option<BTreeMap<String, EffectLink>>,
}

impl RelationshipResult {
    pub fn with_results<I, K>(results: I) -> Self
    where
        I: IntoIterator<Item = (K, EffectLink)>,
        K: Into<String>,
    {
        Self {
            results: Some(results.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Flattens the results into an [`EffectEntry`], or `None` when the
    /// service reported no results at all. Links without a URL are left out
    /// of the entry, but never drop the entry itself.
    pub fn into_entry(self) -> Option<EffectEntry> {
        let results = self.results.filter(|results| !results.is_empty())?;

        Some(
            results
                .into_iter()
                .filter_map(|(effect, link)| link.fullurl.map(|url| (effect, url)))
                .collect(),
        )
    }
}

fn object_or_none<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, EffectLink>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(map) => {
            let mut results = BTreeMap::new();
            for (effect, link) in map {
                let link = EffectLink::deserialize(link).map_err(serde::de::Error::custom)?;
                results.insert(effect, link);
            }
            Ok(Some(results))
        }
        _ => Ok(None),
    }
}

/// Effect name → canonical URL.
pub type EffectEntry = BTreeMap<String, String>;

/// Drug name → its effects. Ordered so the serialized document is stable.
pub type EffectMap = BTreeMap<String, EffectEntry>;
