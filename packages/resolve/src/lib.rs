#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolution of polling-station records into GeoJSON features.
//!
//! [`pipeline::Pipeline`] prepares each record (normalize, extract hints,
//! plan queries), [`engine::ResolutionEngine`] resolves the plan against
//! a geocoder through a per-run [`cache::QueryCache`], and
//! [`assemble`](assemble::assemble) turns the outcome into a feature.

pub mod assemble;
pub mod cache;
pub mod engine;
pub mod pipeline;
pub mod progress;

use std::time::Duration;

use casillas_geo_address::RegionError;
use casillas_geo_geocoder::GeocodeError;
use casillas_geo_geocoder::nominatim::NominatimGeocoder;
use casillas_geo_geocoder::rate_limit::RateLimitedGeocoder;
use casillas_geo_geocoder::service_registry::GeocodingService;
use thiserror::Error;

use crate::engine::ResolutionEngine;

/// Errors that stop a run before any record is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Region profile or extraction patterns are unusable.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// The geocoding service could not be set up.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Engine backed by the production Nominatim client.
pub type NominatimEngine = ResolutionEngine<RateLimitedGeocoder<NominatimGeocoder>>;

/// Builds an engine for a configured service.
///
/// `base_url` overrides the service endpoint; `record_pause` is the sleep
/// between records.
///
/// # Errors
///
/// Returns [`PipelineError::Geocode`] if the client cannot be built.
pub fn engine_for_service(
    service: &GeocodingService,
    base_url: Option<&str>,
    record_pause: Duration,
) -> Result<NominatimEngine, PipelineError> {
    let geocoder = service.build(base_url)?;
    log::info!(
        "Using geocoder '{}' at {} (min delay {:?}, {} retries)",
        service.id,
        geocoder.inner().base_url(),
        geocoder.policy().min_delay,
        geocoder.policy().max_retries
    );
    Ok(ResolutionEngine::new(geocoder).with_record_pause(record_pause))
}

#[cfg(test)]
mod tests {
    use casillas_geo_geocoder::service_registry::find;

    use super::*;

    #[test]
    fn builds_engine_for_registered_service() {
        let service = find("nominatim_local").unwrap();
        let engine =
            engine_for_service(&service, Some("http://127.0.0.1:9/search"), Duration::ZERO)
                .unwrap();
        assert_eq!(
            engine.geocoder().inner().base_url(),
            "http://127.0.0.1:9/search"
        );
        assert!(engine.cache().is_empty());
    }
}
