//! One geocoding run over a list of records.

use std::sync::Arc;

use casillas_geo_address::extract::RegionExtractor;
use casillas_geo_address::normalize::normalize_address;
use casillas_geo_address::query::{QueryBuilder, QueryPlan, QueryStrategy};
use casillas_geo_address::region::RegionProfile;
use casillas_geo_geocoder::Geocoder;
use casillas_geo_models::{
    GeocodeStatus, NormalizedAddress, Record, RegionHints, RunTally, SectionMunicipalities,
};
use geojson::{Feature, FeatureCollection};

use crate::PipelineError;
use crate::assemble::{assemble, feature_collection};
use crate::cache::CacheStats;
use crate::engine::ResolutionEngine;
use crate::progress::ProgressCallback;

/// Everything derived from a record before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRecord {
    pub normalized: NormalizedAddress,
    pub hints: RegionHints,
    pub plan: QueryPlan,
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunReport {
    /// One feature per input record, in input order.
    pub features: Vec<Feature>,
    pub tally: RunTally,
    pub cache: CacheStats,
}

impl RunReport {
    #[must_use]
    pub fn into_collection(self) -> FeatureCollection {
        feature_collection(self.features)
    }
}

/// Normalization, extraction, and query planning for one region.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: RegionExtractor,
    builder: QueryBuilder,
    municipalities: SectionMunicipalities,
}

impl Pipeline {
    #[must_use]
    pub fn new(extractor: RegionExtractor, builder: QueryBuilder) -> Self {
        Self {
            extractor,
            builder,
            municipalities: SectionMunicipalities::new(),
        }
    }

    /// Builds the pipeline for a region profile and tier strategy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Region`] if the profile's extraction
    /// patterns cannot be compiled.
    pub fn from_profile(
        profile: &RegionProfile,
        strategy: QueryStrategy,
    ) -> Result<Self, PipelineError> {
        let extractor = RegionExtractor::from_profile(profile)?;
        let builder = QueryBuilder::from_profile(profile).with_strategy(strategy);
        Ok(Self::new(extractor, builder))
    }

    /// Sets the section → municipality fallback table.
    #[must_use]
    pub fn with_municipalities(mut self, municipalities: SectionMunicipalities) -> Self {
        self.municipalities = municipalities;
        self
    }

    #[must_use]
    pub const fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Normalizes a record, mines its hints, and plans its queries.
    #[must_use]
    pub fn prepare(&self, record: &Record) -> PreparedRecord {
        let normalized = normalize_address(&record.address);
        let hints = self
            .extractor
            .extract_for_record(record, &self.municipalities);
        let mut plan = self.builder.plan(&normalized, &hints);
        // Only a record with neither DOMICILIO nor LOCALIDAD is SIN_DIRECCION,
        // even when normalization leaves nothing of the address.
        plan.has_address_material |=
            !record.address.trim().is_empty() || record.locality().is_some();

        PreparedRecord {
            normalized,
            hints,
            plan,
        }
    }

    /// Resolves every record in order and assembles the features.
    pub async fn run<G: Geocoder>(
        &self,
        engine: &mut ResolutionEngine<G>,
        records: &[Record],
        progress: &Arc<dyn ProgressCallback>,
    ) -> RunReport {
        let total = records.len();
        let mut tally = RunTally::default();
        let mut features = Vec::with_capacity(total);

        progress.set_total(total as u64);
        log::info!("Geocoding {total} casillas...");

        for (index, record) in records.iter().enumerate() {
            let n = index + 1;
            let prepared = self.prepare(record);
            let resolution = engine.resolve(&prepared.plan).await;

            match (resolution.status, resolution.coordinate) {
                (GeocodeStatus::Ok, Some(c)) => log::info!(
                    "[{n}/{total}] OK   Sec {} Casilla {} -> {:.6}, {:.6}",
                    record.section,
                    record.station,
                    c.latitude,
                    c.longitude
                ),
                (GeocodeStatus::SinDireccion, _) => log::info!(
                    "[{n}/{total}] SKIP Sec {} Casilla {} (no address)",
                    record.section,
                    record.station
                ),
                _ => log::info!(
                    "[{n}/{total}] FAIL Sec {} Casilla {} -> \"{}\"",
                    record.section,
                    record.station,
                    resolution.query
                ),
            }

            let (ok, fail) = tally.tally(resolution.status);
            features.push(assemble(
                record,
                &prepared.normalized,
                &prepared.hints,
                &resolution,
            ));

            progress.inc(1);
            progress.set_message(format!("{ok} ok, {fail} fail"));

            if prepared.plan.is_queryable() && n < total {
                engine.courtesy_pause().await;
            }
        }

        let cache = engine.cache_stats();
        progress.finish(format!("{} ok, {} fail", tally.ok, tally.fail));

        RunReport {
            features,
            tally,
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use casillas_geo_models::Coordinate;
    use geojson::JsonValue;

    use super::*;
    use crate::engine::tests::FakeGeocoder;
    use crate::progress::null_progress;

    fn pipeline() -> Pipeline {
        Pipeline::from_profile(&RegionProfile::guanajuato(), QueryStrategy::Urban).unwrap()
    }

    fn record(section: &str, station: &str, address: &str) -> Record {
        Record {
            section: section.to_string(),
            station: station.to_string(),
            locality: None,
            address: address.to_string(),
            kind: None,
        }
    }

    fn engine(geocoder: FakeGeocoder) -> ResolutionEngine<FakeGeocoder> {
        ResolutionEngine::new(geocoder).with_record_pause(Duration::ZERO)
    }

    #[test]
    fn prepare_uses_section_table_for_municipality() {
        let pipeline = pipeline()
            .with_municipalities([("1234".to_string(), "LEON".to_string())].into());

        let prepared = pipeline.prepare(&record("01234", "B1", "CALLE HIDALGO 12, COLONIA CENTRO"));

        assert_eq!(prepared.normalized.short, "CALLE HIDALGO 12");
        assert_eq!(prepared.hints.municipality.as_deref(), Some("LEON"));
        assert_eq!(
            prepared.plan.candidates[0],
            "CALLE HIDALGO 12, LEON, Guanajuato, Mexico"
        );
    }

    #[test]
    fn prepare_extracts_hints_from_full_address() {
        let prepared = pipeline().prepare(&record(
            "2001",
            "C1",
            "ESCUELA PRIMARIA, CALLE MORELOS 5, SAN JUAN, 36000, GUANAJUATO, GUANAJUATO",
        ));
        assert_eq!(prepared.hints.postal_code.as_deref(), Some("36000"));
        assert_eq!(prepared.hints.municipality.as_deref(), Some("Guanajuato"));
    }

    #[tokio::test]
    async fn noise_only_address_still_queries_its_municipality() {
        let abasolo = Coordinate::new(-101.53, 20.45);
        let mut engine = engine(
            FakeGeocoder::default().with_answer("Abasolo, Guanajuato, Mexico", abasolo),
        );
        let pipeline = pipeline();
        let records = vec![record(
            "1",
            "B1",
            "FRENTE A LA ESCUELA, 36970, ABASOLO, GUANAJUATO, MEXICO",
        )];

        let prepared = pipeline.prepare(&records[0]);
        assert!(prepared.normalized.is_empty());
        assert_eq!(prepared.hints.municipality.as_deref(), Some("Abasolo"));
        assert!(prepared.plan.is_queryable());

        let report = pipeline.run(&mut engine, &records, &null_progress()).await;
        assert_eq!(
            report.features[0]
                .property("GEOCOD_STATUS")
                .and_then(JsonValue::as_str),
            Some("OK")
        );
        assert_eq!(engine.geocoder().calls("Abasolo, Guanajuato, Mexico"), 1);
    }

    #[test]
    fn blank_address_and_locality_is_not_queryable() {
        let prepared = pipeline().prepare(&record("7", "B1", "  "));
        assert!(!prepared.plan.is_queryable());
    }

    #[tokio::test]
    async fn one_feature_per_record_with_every_status() {
        let leon = Coordinate::new(-101.68, 21.12);
        let geocoder = FakeGeocoder::default().with_answer("LEON, Guanajuato, Mexico", leon);
        let mut engine = engine(geocoder);
        let pipeline = pipeline().with_municipalities(
            [
                ("1".to_string(), "LEON".to_string()),
                ("3".to_string(), "LEON".to_string()),
            ]
            .into(),
        );

        let records = vec![
            record("1", "B1", "CALLE HIDALGO 12, COLONIA CENTRO"),
            record("2", "B1", "   "),
            record("3", "C1", "CALLE HIDALGO 12"),
            record("4", "B1", "CAMINO VIEJO KM 3"),
        ];

        let report = pipeline.run(&mut engine, &records, &null_progress()).await;

        assert_eq!(report.features.len(), records.len());
        let statuses: Vec<&str> = report
            .features
            .iter()
            .filter_map(|f| f.property("GEOCOD_STATUS").and_then(JsonValue::as_str))
            .collect();
        assert_eq!(statuses, vec!["OK", "SIN_DIRECCION", "OK", "SIN_MATCH"]);

        assert!(report.features[0].geometry.is_some());
        assert!(report.features[1].geometry.is_none());
        assert!(report.features[3].geometry.is_none());

        assert_eq!(report.tally.ok, 2);
        assert_eq!(report.tally.fail, 2);
        assert_eq!(report.tally.total(), 4);
        assert_eq!(report.tally.count(GeocodeStatus::SinDireccion), 1);

        assert_eq!(
            engine
                .geocoder()
                .calls("CALLE HIDALGO 12, LEON, Guanajuato, Mexico"),
            1
        );
        assert_eq!(engine.geocoder().calls("LEON, Guanajuato, Mexico"), 1);
        assert!(report.cache.hits >= 2);
    }

    #[tokio::test]
    async fn empty_input_produces_empty_collection() {
        let mut engine = engine(FakeGeocoder::default());
        let report = pipeline().run(&mut engine, &[], &null_progress()).await;
        assert!(report.features.is_empty());
        assert_eq!(report.tally.total(), 0);
        assert!(report.into_collection().features.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_queried_records() {
        let mut engine =
            ResolutionEngine::new(FakeGeocoder::default()).with_record_pause(Duration::from_millis(200));
        let records = vec![
            record("1", "B1", "CALLE HIDALGO 12"),
            record("2", "B1", ""),
            record("3", "B1", "CALLE MINA 4"),
        ];

        let start = tokio::time::Instant::now();
        pipeline().run(&mut engine, &records, &null_progress()).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(400));
    }
}
