//! Per-run geocoding result cache.
//!
//! Caches both successful lookups (with a coordinate) and failed ones
//! (no coordinate) keyed by the exact query string, so a query shared by
//! many casillas (the municipality and state fallbacks especially) hits
//! the geocoder once per run. Nothing is persisted.

use std::collections::BTreeMap;
use std::fmt;

use casillas_geo_models::Coordinate;
use serde::Serialize;

/// Hit/miss counters for a [`QueryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Distinct queries stored.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to go to the geocoder.
    pub misses: u64,
}

impl CacheStats {
    #[must_use]
    pub const fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queries cached, {} hits, {} misses",
            self.entries, self.hits, self.misses
        )
    }
}

/// Exact query string → outcome.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: BTreeMap<String, Option<Coordinate>>,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached outcome for `query`, counting a hit or a miss.
    ///
    /// The outer `Option` is presence in the cache; the inner one is the
    /// cached outcome (`None` = the geocoder found nothing).
    pub fn lookup(&mut self, query: &str) -> Option<Option<Coordinate>> {
        let cached = self.entries.get(query).copied();
        if cached.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        cached
    }

    /// Stores the outcome for `query`, replacing any previous one.
    pub fn insert(&mut self, query: &str, outcome: Option<Coordinate>) {
        self.entries.insert(query.to_string(), outcome);
    }

    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
