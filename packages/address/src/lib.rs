#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address handling for polling-station geocoding.
//!
//! Turns the free-text `DOMICILIO` of a casilla into geocoder queries:
//!
//! 1. [`normalize`] cleans the text and derives the short address.
//! 2. [`extract`] mines postal code, municipality, and locality hints.
//! 3. [`query`] composes the ordered candidate queries.
//!
//! The target state, country, and locality corrections come from a
//! [`region::RegionProfile`].

pub mod extract;
pub mod normalize;
pub mod query;
pub mod region;
pub mod tables;

use thiserror::Error;

/// Errors from loading region profiles or building extractors.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Region profile TOML could not be parsed.
    #[error("Region profile error: {0}")]
    Profile(#[from] toml::de::Error),

    /// An extraction pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// The profile parsed but is unusable.
    #[error("Invalid region profile: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}
