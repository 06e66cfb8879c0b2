//! Basic-facts adapter for the REST Countries v3.1 API.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use worldsync_core::{BasicFacts, CountryCode};

use super::{FactsSource, SourceError};
use crate::http::{Fetch, HttpRequest};

/// Default REST Countries endpoint.
pub const DEFAULT_FACTS_BASE_URL: &str = "https://restcountries.com/v3.1";

/// Field groups requested separately to stay under the upstream's
/// per-request field limit. Every group carries `cca2` so results can be
/// merged.
pub const DEFAULT_FIELD_GROUPS: [&[&str]; 2] = [
    &["cca2", "name", "population", "capital"],
    &["cca2", "latlng", "languages", "timezones", "gini"],
];

/// Endpoint and field selection of the basic-facts adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactsSourceConfig {
    /// API root without a trailing slash.
    pub base_url: String,
    /// Field groups, one request per group.
    pub field_groups: Vec<Vec<String>>,
}

impl Default for FactsSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FACTS_BASE_URL.to_owned(),
            field_groups: DEFAULT_FIELD_GROUPS
                .iter()
                .map(|group| group.iter().map(|field| (*field).to_owned()).collect())
                .collect(),
        }
    }
}

impl FactsSourceConfig {
    /// Set the API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Fetches identity facts with field-scoped requests and deep-merges them
/// per country.
pub struct RestCountriesSource {
    fetch: Arc<dyn Fetch>,
    config: FactsSourceConfig,
}

impl std::fmt::Debug for RestCountriesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestCountriesSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestCountriesSource {
    /// Create the adapter.
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, config: FactsSourceConfig) -> Self {
        Self { fetch, config }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn requests(&self, path: &str) -> impl Iterator<Item = HttpRequest> + '_ {
        let url = format!("{}/{path}", self.base());
        self.config
            .field_groups
            .iter()
            .map(move |group| HttpRequest::new(url.as_str()).param("fields", group.join(",")))
    }
}

impl FactsSource for RestCountriesSource {
    fn fetch_all(&self) -> Result<Vec<BasicFacts>, SourceError> {
        let mut merged: BTreeMap<String, Value> = BTreeMap::new();
        for request in self.requests("all") {
            let Value::Array(entries) = self.fetch.get_json(&request)? else {
                return Err(SourceError::Malformed {
                    url: request.signature(),
                    reason: "expected a JSON array of countries".to_owned(),
                });
            };
            for entry in entries {
                let Some(key) = entry_code(&entry) else {
                    debug!("skipping entry without cca2 from {}", request.signature());
                    continue;
                };
                match merged.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                    Entry::Occupied(mut slot) => deep_merge(slot.get_mut(), entry),
                }
            }
        }
        let facts: Vec<BasicFacts> = merged.values().filter_map(normalise).collect();
        info!("fetched {} countries from {}", facts.len(), self.base());
        Ok(facts)
    }

    fn fetch(&self, code: &CountryCode) -> Result<Option<BasicFacts>, SourceError> {
        let mut merged: Option<Value> = None;
        for request in self.requests(&format!("alpha/{code}")) {
            let payload = match self.fetch.get_json(&request) {
                Ok(payload) => payload,
                Err(err) if err.status() == Some(404) => {
                    debug!("{code} is unknown to {}", self.base());
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            };
            let entry = match payload {
                object @ Value::Object(_) => object,
                Value::Array(mut entries) if entries.len() <= 1 => match entries.pop() {
                    Some(entry) => entry,
                    None => return Ok(None),
                },
                _ => {
                    return Err(SourceError::Malformed {
                        url: request.signature(),
                        reason: "expected one country object".to_owned(),
                    });
                }
            };
            match merged.as_mut() {
                Some(target) => deep_merge(target, entry),
                None => merged = Some(entry),
            }
        }
        Ok(merged.as_ref().and_then(normalise))
    }
}

fn entry_code(entry: &Value) -> Option<String> {
    entry
        .get("cca2")
        .and_then(Value::as_str)
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
}

/// Merge `patch` into `target`: objects merge key by key, recursively;
/// anything else in `patch` replaces what `target` held.
pub(crate) fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Map one merged upstream entry onto [`BasicFacts`].
fn normalise(entry: &Value) -> Option<BasicFacts> {
    let raw = entry.get("cca2").and_then(Value::as_str)?;
    let code = match CountryCode::parse(raw) {
        Ok(code) => code,
        Err(err) => {
            warn!("skipping country with unusable code: {err}");
            return None;
        }
    };
    let text = |pointer: &str| {
        entry
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    let mut facts = BasicFacts::new(code);
    facts.name = text("/name/common");
    facts.official_name = text("/name/official");
    facts.population = entry.get("population").and_then(Value::as_u64);
    facts.capital = text("/capital/0");
    facts.latitude = entry.pointer("/latlng/0").and_then(Value::as_f64);
    facts.longitude = entry.pointer("/latlng/1").and_then(Value::as_f64);
    facts.languages = entry
        .get("languages")
        .and_then(Value::as_object)
        .map(|languages| {
            let mut pairs: Vec<(&String, &str)> = languages
                .iter()
                .filter_map(|(key, name)| name.as_str().map(|name| (key, name)))
                .collect();
            pairs.sort_by(|left, right| left.0.cmp(right.0));
            pairs.into_iter().map(|(_, name)| name.to_owned()).collect()
        })
        .unwrap_or_default();
    facts.timezones = entry
        .get("timezones")
        .and_then(Value::as_array)
        .map(|zones| {
            zones
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    facts.gini = entry
        .get("gini")
        .and_then(Value::as_object)
        .and_then(|years| years.values().next())
        .and_then(Value::as_f64);
    Some(facts)
}
