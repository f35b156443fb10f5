//! Region hint extraction from full address text.
//!
//! Complete addresses in the source files end with a structured tail:
//!
//! ```text
//! ESCUELA PRIMARIA, LOCALIDAD LA ESTANCIA, 36970, ABASOLO, GUANAJUATO, MEXICO
//! ```
//!
//! [`RegionExtractor`] pulls the postal code, municipality, and locality
//! out of that tail. Anything that does not fit the pattern yields `None`
//! fields; extraction never fails.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use casillas_geo_models::{Record, RegionHints, SectionMunicipalities, section_key};
use regex::Regex;

use crate::RegionError;
use crate::normalize::{fold_diacritics, title_case};
use crate::region::RegionProfile;

/// Explicit `LOCALIDAD <name>` marker.
static LOCALIDAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bLOCALIDAD\b\s*:?\s*([^,]+)").expect("valid regex"));

/// Table of known garbled locality names and their canonical forms.
///
/// Keys are compared upper-cased, first verbatim and then with diacritics
/// folded, so `"Estacion Joaquon"` still hits an `"ESTACIÓN JOAQUÓN"`
/// entry.
#[derive(Debug, Clone, Default)]
pub struct LocalityCorrections {
    exact: BTreeMap<String, String>,
    folded: BTreeMap<String, String>,
}

impl LocalityCorrections {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a correction.
    pub fn insert(&mut self, garbled: &str, canonical: &str) {
        let key = garbled.trim().to_uppercase();
        self.folded
            .insert(fold_diacritics(&key), canonical.to_string());
        self.exact.insert(key, canonical.to_string());
    }

    /// Builder-style [`Self::insert`].
    #[must_use]
    pub fn with_entry(mut self, garbled: &str, canonical: &str) -> Self {
        self.insert(garbled, canonical);
        self
    }

    /// Returns the canonical form of `name`, if the table has one.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = name.trim().to_uppercase();
        self.exact
            .get(&key)
            .or_else(|| self.folded.get(&fold_diacritics(&key)))
            .map(String::as_str)
    }

    /// Returns the canonical form of `name`, or `name` unchanged.
    #[must_use]
    pub fn correct<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for LocalityCorrections {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (garbled, canonical) in iter {
            table.insert(garbled.as_ref(), canonical.as_ref());
        }
        table
    }
}

/// Extracts [`RegionHints`] from address text for one target state.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    /// `, <CP>, <MUNICIPIO>, <STATE>`
    postal_re: Regex,
    /// `, <LOCALIDAD>, <CP>, <ANCHOR>`
    positional_re: Regex,
    corrections: LocalityCorrections,
}

impl RegionExtractor {
    /// Builds an extractor for `state`. When `anchor_municipality` is set,
    /// the positional locality pattern only accepts that municipality;
    /// otherwise it accepts any municipality followed by `state`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Pattern`] if the patterns cannot be compiled.
    pub fn new(state: &str, anchor_municipality: Option<&str>) -> Result<Self, RegionError> {
        let state = regex::escape(&fold_diacritics(&state.to_uppercase()));
        let postal_re = Regex::new(&format!(r",\s*(\d{{5}}),\s*([^,]+?)\s*,\s*{state}\b"))?;

        let anchor = anchor_municipality
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map_or_else(
                || format!(r"[^,]+,\s*{state}\b"),
                |a| format!(r"{}\b", regex::escape(&fold_diacritics(&a.to_uppercase()))),
            );
        let positional_re = Regex::new(&format!(r",\s*([^,]+?)\s*,\s*\d{{5}}\s*,\s*{anchor}"))?;

        Ok(Self {
            postal_re,
            positional_re,
            corrections: LocalityCorrections::new(),
        })
    }

    /// Builds an extractor from a region profile, including its locality
    /// corrections.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Pattern`] if the patterns cannot be compiled.
    pub fn from_profile(profile: &RegionProfile) -> Result<Self, RegionError> {
        let extractor = Self::new(&profile.state, profile.anchor_municipality.as_deref())?;
        Ok(extractor.with_corrections(profile.locality_corrections.iter().collect()))
    }

    /// Replaces the locality correction table.
    #[must_use]
    pub fn with_corrections(mut self, corrections: LocalityCorrections) -> Self {
        self.corrections = corrections;
        self
    }

    #[must_use]
    pub const fn corrections(&self) -> &LocalityCorrections {
        &self.corrections
    }

    /// Extracts postal code, municipality, and locality from `full_text`.
    #[must_use]
    pub fn extract(&self, full_text: &str) -> RegionHints {
        if full_text.trim().is_empty() {
            return RegionHints::default();
        }

        let upper = full_text
            .to_uppercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        // State/anchor patterns are diacritic-free; the locality keeps its
        // original spelling so garbled names still hit the correction table.
        let folded = fold_diacritics(&upper);

        let (postal_code, municipality) = self
            .postal_re
            .captures(&folded)
            .map_or((None, None), |caps| {
                let municipality = caps_text(&upper, &folded, caps.get(2));
                (
                    Some(caps[1].to_string()),
                    municipality.map(|m| title_case(&m)),
                )
            });

        let locality = self.extract_locality(&upper, &folded);

        RegionHints {
            postal_code,
            municipality,
            locality,
        }
    }

    fn extract_locality(&self, upper: &str, folded: &str) -> Option<String> {
        let raw = LOCALIDAD_RE
            .captures(upper)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .or_else(|| {
                self.positional_re
                    .captures(folded)
                    .and_then(|caps| caps_text(upper, folded, caps.get(1)))
            })
            .filter(|s| !s.is_empty())?;

        Some(title_case(self.corrections.correct(&raw)))
    }

    /// Extracts hints for a record: the record's own locality wins over an
    /// extracted one, and the municipality falls back to the section table.
    #[must_use]
    pub fn extract_for_record(
        &self,
        record: &Record,
        municipalities: &SectionMunicipalities,
    ) -> RegionHints {
        let mut hints = self.extract(&record.address);

        if let Some(locality) = record.locality() {
            hints.locality = Some(locality.to_string());
        }

        if hints.municipality.is_none() {
            hints.municipality = municipalities
                .get(&section_key(&record.section))
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());
            if hints.municipality.is_some() {
                log::debug!(
                    "Section {}: municipality from section table",
                    record.section
                );
            }
        }

        hints
    }
}

/// Maps a capture on the folded text back to the same span of the
/// original upper-cased text.
///
/// The n-th character of `folded` corresponds to the n-th character of
/// `upper` whenever both have the same number of characters (precomposed
/// input); otherwise the folded capture is returned.
fn caps_text(upper: &str, folded: &str, m: Option<regex::Match<'_>>) -> Option<String> {
    let m = m?;
    let text = if upper.chars().count() == folded.chars().count() {
        let start = folded[..m.start()].chars().count();
        let len = m.as_str().chars().count();
        upper.chars().skip(start).take(len).collect::<String>()
    } else {
        m.as_str().to_string()
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}
