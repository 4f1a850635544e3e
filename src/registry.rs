//! Country and originator registry.
//!
//! Filter parameters take human-readable names ("Lithuania", "Aventus
//! Group") while the API wants numeric ids. The mapping comes from the
//! unauthenticated `/v1/globals` endpoint and is fetched at most once per
//! client.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Raw `/v1/globals` payload, reduced to the parts the client resolves
/// against. Unknown fields ride along untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct Globals {
    #[serde(default)]
    pub countries: Vec<CountryEntry>,
    #[serde(default)]
    pub originators: Vec<OriginatorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryEntry {
    pub title: String,
    pub id: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginatorEntry {
    pub title: String,
    pub id: OriginatorIds,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Some lending groups operate several originator entities; the globals
/// payload then carries a list of ids under a single title.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OriginatorIds {
    One(u64),
    Many(Vec<u64>),
}

impl OriginatorIds {
    pub fn ids(&self) -> Vec<u64> {
        match self {
            OriginatorIds::One(id) => vec![*id],
            OriginatorIds::Many(ids) => ids.clone(),
        }
    }
}

/// Resolved registry with name lookups. Titles are matched trimmed and
/// case-insensitively; the payload pads some of them with trailing spaces.
#[derive(Debug, Clone)]
pub struct GlobalRegistry {
    countries: Vec<CountryEntry>,
    originators: Vec<OriginatorEntry>,
}

impl GlobalRegistry {
    pub fn new(globals: Globals) -> Self {
        Self {
            countries: globals.countries,
            originators: globals.originators,
        }
    }

    pub fn country_id(&self, name: &str) -> Option<u64> {
        let wanted = name.trim();
        self.countries
            .iter()
            .find(|entry| entry.title.trim().eq_ignore_ascii_case(wanted))
            .map(|entry| entry.id)
    }

    pub fn originator_ids(&self, name: &str) -> Option<Vec<u64>> {
        let wanted = name.trim();
        self.originators
            .iter()
            .find(|entry| entry.title.trim().eq_ignore_ascii_case(wanted))
            .map(|entry| entry.id.ids())
    }

    /// Title → entry map, trimmed titles as keys.
    pub fn countries(&self) -> HashMap<String, &CountryEntry> {
        self.countries
            .iter()
            .map(|entry| (entry.title.trim().to_string(), entry))
            .collect()
    }

    pub fn originators(&self) -> HashMap<String, &OriginatorEntry> {
        self.originators
            .iter()
            .map(|entry| (entry.title.trim().to_string(), entry))
            .collect()
    }

    pub fn country_names(&self) -> Vec<String> {
        self.countries
            .iter()
            .map(|entry| entry.title.trim().to_string())
            .collect()
    }

    pub fn originator_names(&self) -> Vec<String> {
        self.originators
            .iter()
            .map(|entry| entry.title.trim().to_string())
            .collect()
    }
}
