#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the polling-station geocoding pipeline.
//!
//! A [`Record`] is one casilla (polling station) as read from the input
//! file. Each record is normalized into a [`NormalizedAddress`], mined for
//! [`RegionHints`], resolved into a [`ResolutionResult`], and finally
//! counted in a [`RunTally`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Maps an electoral section id to the municipality it belongs to.
pub type SectionMunicipalities = BTreeMap<String, String>;

/// Canonical form of a section id for side-table lookups: trimmed, with
/// leading zeros removed (`"0042"` and `"42"` are the same section).
#[must_use]
pub fn section_key(section: &str) -> String {
    let trimmed = section.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// One polling-station entry as read from the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Electoral section id (`SECCION`).
    pub section: String,
    /// Polling-station id within the section (`CASILLA` / `CLAVE`).
    pub station: String,
    /// Locality name, when the source provides one.
    pub locality: Option<String>,
    /// Raw free-text address (`DOMICILIO`).
    pub address: String,
    /// Casilla type (`BASICA`, `CONTIGUA`, ...), when present.
    pub kind: Option<String>,
}

impl Record {
    /// Returns the locality with surrounding whitespace removed, or `None`
    /// if it is missing or blank.
    #[must_use]
    pub fn locality(&self) -> Option<&str> {
        self.locality
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Final classification of a record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GeocodeStatus {
    /// A candidate query resolved to a coordinate.
    Ok,
    /// Candidates were tried and none matched.
    SinMatch,
    /// The record had no address material to build a query from.
    SinDireccion,
}

/// A raw address after cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    /// Full cleaned text (`DOMICILIO_LIMPIO`).
    pub cleaned: String,
    /// `cleaned` truncated before the first neighbourhood marker
    /// (`DOMICILIO_CORTO`). Always a prefix of `cleaned`, or empty.
    pub short: String,
}

impl NormalizedAddress {
    /// Returns the most specific non-empty street text, preferring the
    /// short form.
    #[must_use]
    pub fn street(&self) -> Option<&str> {
        [self.short.as_str(), self.cleaned.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cleaned.is_empty()
    }
}

/// Structured hints mined from an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionHints {
    /// Five-digit postal code.
    pub postal_code: Option<String>,
    /// Municipality name.
    pub municipality: Option<String>,
    /// Locality name, after corrections.
    pub locality: Option<String>,
}

/// Outcome of resolving one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// The query that matched, or the last one attempted on failure.
    /// Empty for [`GeocodeStatus::SinDireccion`].
    pub query: String,
    /// Resolved position. Present only when `status` is `Ok`.
    pub coordinate: Option<Coordinate>,
    /// Classification.
    pub status: GeocodeStatus,
}

impl ResolutionResult {
    #[must_use]
    pub const fn matched(query: String, coordinate: Coordinate) -> Self {
        Self {
            query,
            coordinate: Some(coordinate),
            status: GeocodeStatus::Ok,
        }
    }

    #[must_use]
    pub const fn no_match(last_query: String) -> Self {
        Self {
            query: last_query,
            coordinate: None,
            status: GeocodeStatus::SinMatch,
        }
    }

    #[must_use]
    pub const fn no_address() -> Self {
        Self {
            query: String::new(),
            coordinate: None,
            status: GeocodeStatus::SinDireccion,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, GeocodeStatus::Ok)
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    /// Records resolved to a coordinate.
    pub ok: u64,
    /// Records that ended in `SIN_MATCH` or `SIN_DIRECCION`.
    pub fail: u64,
    /// Breakdown by status.
    pub by_status: BTreeMap<GeocodeStatus, u64>,
}

impl RunTally {
    /// Counts one record with the given status and returns the updated
    /// `(ok, fail)` pair.
    pub fn tally(&mut self, status: GeocodeStatus) -> (u64, u64) {
        match status {
            GeocodeStatus::Ok => self.ok += 1,
            GeocodeStatus::SinMatch | GeocodeStatus::SinDireccion => self.fail += 1,
        }
        *self.by_status.entry(status).or_default() += 1;
        (self.ok, self.fail)
    }

    /// Total records counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.ok + self.fail
    }

    /// Count for a single status.
    #[must_use]
    pub fn count(&self, status: GeocodeStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
