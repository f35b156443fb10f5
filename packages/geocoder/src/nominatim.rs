//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Only free-form search is used: polling-station queries are composed
//! strings like `"CALLE HIDALGO 12, Leon, Guanajuato, Mexico"`, not
//! structured street/city/state fields.
//!
//! The public instance has strict rate limits (1 request per second) and
//! requires an identifying User-Agent. Pacing is not done here; wrap the
//! client in [`crate::rate_limit::RateLimitedGeocoder`].
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;

use crate::{GeocodeError, GeocodedPoint, Geocoder};

/// A Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: String,
}

impl NominatimGeocoder {
    /// Creates a client for `base_url` (the `/search` endpoint).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the user agent is empty or the HTTP
    /// client cannot be built.
    pub fn new(
        base_url: &str,
        user_agent: &str,
        country_codes: &str,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        if user_agent.trim().is_empty() {
            return Err(GeocodeError::Config {
                message: "Nominatim requires a non-empty User-Agent".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            country_codes: country_codes.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
        geocode_freeform(&self.client, &self.base_url, &self.country_codes, query).await
    }
}

/// Geocodes a free-form query using Nominatim.
///
/// The caller is responsible for rate limiting (see `rate_limit_ms` in the
/// service TOML configuration).
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    country_codes: &str,
    query: &str,
) -> Result<Option<GeocodedPoint>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("countrycodes", country_codes),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    if !resp.status().is_success() {
        return Err(GeocodeError::Status {
            status: resp.status().as_u16(),
        });
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedPoint>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedPoint {
        latitude: lat,
        longitude: lon,
        matched_address: display_name,
    }))
}
