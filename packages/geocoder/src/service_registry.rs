//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`].

use std::time::Duration;

use serde::Deserialize;

use crate::GeocodeError;
use crate::nominatim::NominatimGeocoder;
use crate::rate_limit::{RateLimitPolicy, RateLimitedGeocoder};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`, `"nominatim_local"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service is used when none is named explicitly.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Preference order, lower values first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` free-form search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Identifying User-Agent, required by the public instance.
        user_agent: String,
        /// Comma-separated ISO country codes to restrict results to.
        #[serde(default = "default_country_codes")]
        country_codes: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Retries after a failed request.
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        /// Wait before retrying a failed request, in milliseconds.
        #[serde(default = "default_error_wait_ms")]
        error_wait_ms: u64,
        /// Per-request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

const fn default_true() -> bool {
    true
}

fn default_country_codes() -> String {
    "mx".to_string()
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_error_wait_ms() -> u64 {
    3000
}

const fn default_timeout_secs() -> u64 {
    15
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Pacing and retry settings declared by the provider.
    #[must_use]
    pub const fn policy(&self) -> RateLimitPolicy {
        match &self.provider {
            ProviderConfig::Nominatim {
                rate_limit_ms,
                max_retries,
                error_wait_ms,
                ..
            } => RateLimitPolicy {
                min_delay: Duration::from_millis(*rate_limit_ms),
                max_retries: *max_retries,
                error_wait: Duration::from_millis(*error_wait_ms),
                rate_limited_wait: RateLimitPolicy::DEFAULT_RATE_LIMITED_WAIT,
            },
        }
    }

    /// Builds the rate-limited client for this service.
    ///
    /// `base_url` replaces the configured endpoint when given.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built or the
    /// configuration is unusable.
    pub fn build(
        &self,
        base_url: Option<&str>,
    ) -> Result<RateLimitedGeocoder<NominatimGeocoder>, GeocodeError> {
        let ProviderConfig::Nominatim {
            base_url: configured,
            user_agent,
            country_codes,
            timeout_secs,
            ..
        } = &self.provider;

        let base_url = base_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(configured.as_str());

        log::debug!("Building geocoder '{}' for {base_url}", self.id);

        let client = NominatimGeocoder::new(
            base_url,
            user_agent,
            country_codes,
            Duration::from_secs(*timeout_secs),
        )?;

        Ok(RateLimitedGeocoder::new(client, self.policy()))
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    (
        "nominatim_local",
        include_str!("../services/nominatim_local.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Looks up a service by id, enabled or not.
#[must_use]
pub fn find(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// Returns the highest-priority enabled service.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if every service is disabled.
pub fn default_service() -> Result<GeocodingService, GeocodeError> {
    enabled_services()
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::Config {
            message: "no geocoding service is enabled".to_string(),
        })
}
