//! Candidate resolution.
//!
//! The engine walks a [`QueryPlan`]'s candidates in order, answering each
//! from the run's [`QueryCache`] when it can and from the geocoder
//! otherwise, and stops at the first coordinate.

use std::time::Duration;

use casillas_geo_address::query::QueryPlan;
use casillas_geo_geocoder::Geocoder;
use casillas_geo_models::{Coordinate, ResolutionResult};

use crate::cache::{CacheStats, QueryCache};

/// Pause between records when none is configured.
pub const DEFAULT_RECORD_PAUSE: Duration = Duration::from_millis(200);

/// Resolves query plans against one geocoder, with a per-run cache.
#[derive(Debug)]
pub struct ResolutionEngine<G> {
    geocoder: G,
    cache: QueryCache,
    record_pause: Duration,
}

impl<G: Geocoder> ResolutionEngine<G> {
    /// Creates an engine with an empty cache and the default record pause.
    #[must_use]
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            cache: QueryCache::new(),
            record_pause: DEFAULT_RECORD_PAUSE,
        }
    }

    /// Sets the pause taken by [`Self::courtesy_pause`].
    #[must_use]
    pub fn with_record_pause(mut self, pause: Duration) -> Self {
        self.record_pause = pause;
        self
    }

    #[must_use]
    pub const fn geocoder(&self) -> &G {
        &self.geocoder
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolves one record's plan.
    ///
    /// A plan without address material is `SIN_DIRECCION` without any
    /// lookup. Otherwise the first candidate with a coordinate gives `OK`;
    /// if none has one the result is `SIN_MATCH` carrying the last
    /// candidate tried.
    pub async fn resolve(&mut self, plan: &QueryPlan) -> ResolutionResult {
        if !plan.is_queryable() {
            return ResolutionResult::no_address();
        }

        let mut last_query = String::new();

        for query in &plan.candidates {
            if let Some(coordinate) = self.lookup(query).await {
                return ResolutionResult::matched(query.clone(), coordinate);
            }
            last_query.clone_from(query);
        }

        ResolutionResult::no_match(last_query)
    }

    /// Resolves a single query through the cache.
    ///
    /// Geocoder errors are logged and treated as no match; the outcome is
    /// cached either way.
    pub async fn lookup(&mut self, query: &str) -> Option<Coordinate> {
        if let Some(cached) = self.cache.lookup(query) {
            log::debug!("  cache hit: \"{query}\"");
            return cached;
        }

        let outcome = match self.geocoder.geocode(query).await {
            Ok(Some(point)) => Some(point.coordinate()),
            Ok(None) => {
                log::debug!("  no match: \"{query}\"");
                None
            }
            Err(e) => {
                log::warn!("  lookup failed for \"{query}\": {e}");
                None
            }
        };

        self.cache.insert(query, outcome);
        outcome
    }

    /// Sleeps the configured pause between records.
    pub async fn courtesy_pause(&self) {
        if !self.record_pause.is_zero() {
            tokio::time::sleep(self.record_pause).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use casillas_geo_address::normalize::normalize_address;
    use casillas_geo_address::query::QueryBuilder;
    use casillas_geo_geocoder::{GeocodeError, GeocodedPoint};
    use casillas_geo_models::{GeocodeStatus, RegionHints};

    use super::*;

    /// Answers from a fixed table and counts invocations per query.
    #[derive(Default)]
    pub struct FakeGeocoder {
        answers: BTreeMap<String, Coordinate>,
        fail_all: bool,
        calls: Mutex<BTreeMap<String, usize>>,
    }

    impl FakeGeocoder {
        pub fn with_answer(mut self, query: &str, coordinate: Coordinate) -> Self {
            self.answers.insert(query.to_string(), coordinate);
            self
        }

        pub fn failing() -> Self {
            Self {
                fail_all: true,
                ..Self::default()
            }
        }

        pub fn calls(&self, query: &str) -> usize {
            self.calls.lock().unwrap().get(query).copied().unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(query.to_string())
                .or_default() += 1;

            if self.fail_all {
                return Err(GeocodeError::Status { status: 503 });
            }
            Ok(self
                .answers
                .get(query)
                .map(|c| GeocodedPoint::new(c.longitude, c.latitude)))
        }
    }

    fn builder() -> QueryBuilder {
        QueryBuilder::new("Guanajuato", "Mexico")
    }

    fn plan(address: &str, locality: Option<&str>, municipality: Option<&str>) -> QueryPlan {
        let hints = RegionHints {
            postal_code: None,
            municipality: municipality.map(String::from),
            locality: locality.map(String::from),
        };
        builder().plan(&normalize_address(address), &hints)
    }

    #[tokio::test]
    async fn no_address_material_skips_lookup() {
        let mut engine = ResolutionEngine::new(FakeGeocoder::default());
        let result = engine.resolve(&plan("", None, Some("LEON"))).await;

        assert_eq!(result.status, GeocodeStatus::SinDireccion);
        assert!(result.coordinate.is_none());
        assert!(result.query.is_empty());
        assert_eq!(engine.geocoder().total_calls(), 0);
    }

    #[tokio::test]
    async fn matches_municipality_fallback() {
        let leon = Coordinate::new(-101.68, 21.12);
        let geocoder = FakeGeocoder::default().with_answer("LEON, Guanajuato, Mexico", leon);
        let mut engine = ResolutionEngine::new(geocoder);

        let result = engine
            .resolve(&plan("CALLE HIDALGO 12, COLONIA CENTRO", None, Some("LEON")))
            .await;

        assert_eq!(result.status, GeocodeStatus::Ok);
        assert_eq!(result.query, "LEON, Guanajuato, Mexico");
        assert_eq!(result.coordinate, Some(leon));
        assert_eq!(
            engine.geocoder().calls("CALLE HIDALGO 12, LEON, Guanajuato, Mexico"),
            1
        );
        assert_eq!(engine.geocoder().calls("Guanajuato, Mexico"), 0);
    }

    #[tokio::test]
    async fn failing_geocoder_ends_in_no_match_with_last_candidate() {
        let mut engine = ResolutionEngine::new(FakeGeocoder::failing());
        let plan = plan("CALLE HIDALGO 12", Some("La Luz"), Some("LEON"));

        let result = engine.resolve(&plan).await;

        assert_eq!(result.status, GeocodeStatus::SinMatch);
        assert!(result.coordinate.is_none());
        assert_eq!(result.query, "Guanajuato, Mexico");
        assert_eq!(plan.candidates.last(), Some(&result.query));
        assert_eq!(engine.geocoder().total_calls(), plan.candidates.len());
    }

    #[tokio::test]
    async fn failures_are_cached() {
        let mut engine = ResolutionEngine::new(FakeGeocoder::failing());
        let plan = plan("CALLE HIDALGO 12", None, Some("LEON"));

        engine.resolve(&plan).await;
        engine.resolve(&plan).await;

        for query in &plan.candidates {
            assert_eq!(engine.geocoder().calls(query), 1, "{query}");
        }
        assert_eq!(engine.cache_stats().hits, plan.candidates.len() as u64);
    }

    #[tokio::test]
    async fn shared_queries_hit_the_geocoder_once() {
        let mut engine = ResolutionEngine::new(FakeGeocoder::default());
        let first = plan("CALLE HIDALGO 12", None, Some("LEON"));
        let second = plan("C. HIDALGO 12, COL. CENTRO", None, Some("LEON"));
        assert_eq!(first.candidates[0], second.candidates[0]);

        engine.resolve(&first).await;
        engine.resolve(&second).await;

        assert_eq!(
            engine.geocoder().calls("CALLE HIDALGO 12, LEON, Guanajuato, Mexico"),
            1
        );
        let stats = engine.cache_stats();
        assert_eq!(stats.entries, first.candidates.len());
        assert_eq!(stats.misses, first.candidates.len() as u64);
        assert_eq!(stats.hits, second.candidates.len() as u64);
    }

    #[tokio::test]
    async fn stops_at_first_match() {
        let point = Coordinate::new(-101.2, 20.5);
        let geocoder = FakeGeocoder::default()
            .with_answer("CALLE MINA 4, Silao, Guanajuato, Mexico", point)
            .with_answer("Silao, Guanajuato, Mexico", Coordinate::new(0.0, 0.0));
        let mut engine = ResolutionEngine::new(geocoder);

        let result = engine
            .resolve(&plan("CALLE MINA 4", None, Some("Silao")))
            .await;

        assert_eq!(result.status, GeocodeStatus::Ok);
        assert_eq!(result.coordinate, Some(point));
        assert_eq!(engine.geocoder().calls("Silao, Guanajuato, Mexico"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn courtesy_pause_sleeps_configured_duration() {
        let engine = ResolutionEngine::new(FakeGeocoder::default())
            .with_record_pause(Duration::from_millis(200));
        let start = tokio::time::Instant::now();
        engine.courtesy_pause().await;
        assert!(start.elapsed() >= Duration::from_millis(200));

        let engine = ResolutionEngine::new(FakeGeocoder::default()).with_record_pause(Duration::ZERO);
        let start = tokio::time::Instant::now();
        engine.courtesy_pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
