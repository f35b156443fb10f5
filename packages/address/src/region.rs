//! Region profiles: the state/country a run targets and its extraction
//! parameters.
//!
//! Profiles are TOML files. The built-in ones under `regions/` are
//! embedded at compile time; [`RegionProfile::from_toml_str`] loads any
//! other.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::RegionError;

/// Target region for a geocoding run.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionProfile {
    /// Unique identifier (e.g., `"guanajuato"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// State name as it should appear in queries and in addresses.
    pub state: String,
    /// Country name appended to every query.
    pub country: String,
    /// Municipality anchoring the positional locality pattern. `None`
    /// accepts any municipality followed by the state name.
    #[serde(default)]
    pub anchor_municipality: Option<String>,
    /// Garbled locality name → canonical name.
    #[serde(default)]
    pub locality_corrections: BTreeMap<String, String>,
}

// ── Compile-time embedded TOML files ────────────────────────────────

const REGION_TOMLS: &[(&str, &str)] = &[("guanajuato", include_str!("../regions/guanajuato.toml"))];

/// Id of the profile used when none is requested.
pub const DEFAULT_REGION: &str = "guanajuato";

impl RegionProfile {
    /// Parses a profile from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Profile`] if the TOML is malformed or a
    /// required field is missing.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, RegionError> {
        let profile: Self = toml::de::from_str(toml_str)?;
        if profile.state.trim().is_empty() {
            return Err(RegionError::Invalid {
                message: format!("region '{}' has an empty state name", profile.id),
            });
        }
        Ok(profile)
    }

    /// Returns the built-in profile with the given id.
    ///
    /// # Panics
    ///
    /// Panics if an embedded profile is malformed (this is a compile-time
    /// guarantee since the profiles are embedded).
    #[must_use]
    pub fn builtin(id: &str) -> Option<Self> {
        REGION_TOMLS
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(name, toml_str)| {
                Self::from_toml_str(toml_str)
                    .unwrap_or_else(|e| panic!("Failed to parse region profile '{name}': {e}"))
            })
    }

    /// Returns the default built-in profile (Guanajuato).
    #[must_use]
    pub fn guanajuato() -> Self {
        Self::builtin(DEFAULT_REGION)
            .unwrap_or_else(|| panic!("Missing built-in region profile '{DEFAULT_REGION}'"))
    }
}

/// Ids of all built-in profiles.
#[must_use]
pub fn builtin_ids() -> Vec<&'static str> {
    REGION_TOMLS.iter().map(|(name, _)| *name).collect()
}
