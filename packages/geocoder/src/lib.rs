#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding capability for polling-station queries.
//!
//! The pipeline only needs "given a query string, return a coordinate or
//! no match". That capability is the [`Geocoder`] trait. The production
//! implementation is a Nominatim / `OpenStreetMap` client configured via
//! TOML files in `services/`, wrapped in a
//! [`rate_limit::RateLimitedGeocoder`] that enforces the public instance's
//! usage policy (minimum spacing between requests, bounded retries).

pub mod nominatim;
pub mod rate_limit;
pub mod service_registry;

use std::sync::Arc;

use async_trait::async_trait;
use casillas_geo_models::Coordinate;
use thiserror::Error;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
}

impl GeocodedPoint {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            matched_address: None,
        }
    }

    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Service configuration is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// Resolves a free-form query to a point.
///
/// `Ok(None)` means the service answered and found nothing. `Err` means
/// the lookup itself failed (network, service error, rate limiting).
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes a single free-form query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the lookup could not be completed.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Arc<G> {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
        (**self).geocode(query).await
    }
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
        (**self).geocode(query).await
    }
}
