//! Geocoding query construction.
//!
//! A record yields several candidate queries, from most to least
//! specific. Which fields make up each level is declared as a list of
//! [`QueryTier`]s; the state + country query is always the final
//! fallback.

use std::collections::BTreeSet;

use casillas_geo_models::{NormalizedAddress, RegionHints};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::normalize::fold_diacritics;
use crate::region::RegionProfile;

/// One level of the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QueryTier {
    /// Street address, with the municipality when known.
    Address,
    /// Locality, with the municipality when known.
    Locality,
    /// Municipality alone.
    Municipality,
}

/// Named tier orders.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryStrategy {
    /// Address, then locality, then municipality.
    #[default]
    Urban,
    /// Locality, then municipality, then address. Suits rural sections
    /// where street names are rarely in the map data.
    Rural,
}

impl QueryStrategy {
    #[must_use]
    pub const fn tiers(self) -> &'static [QueryTier] {
        match self {
            Self::Urban => &[QueryTier::Address, QueryTier::Locality, QueryTier::Municipality],
            Self::Rural => &[QueryTier::Locality, QueryTier::Municipality, QueryTier::Address],
        }
    }
}

/// Candidate queries for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Candidates in priority order, deduplicated, never empty.
    pub candidates: Vec<String>,
    /// Whether the record had any address text or locality to build
    /// from. `false` means only region-level fallbacks are present.
    pub has_address_material: bool,
}

impl QueryPlan {
    /// A plan that should be resolved at all.
    #[must_use]
    pub fn is_queryable(&self) -> bool {
        self.has_address_material && !self.candidates.is_empty()
    }
}

/// Builds candidate queries for one state/country.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    state: String,
    country: String,
    tiers: Vec<QueryTier>,
}

impl QueryBuilder {
    /// Creates a builder with the [`QueryStrategy::Urban`] tier order.
    #[must_use]
    pub fn new(state: &str, country: &str) -> Self {
        Self {
            state: state.trim().to_string(),
            country: country.trim().to_string(),
            tiers: QueryStrategy::default().tiers().to_vec(),
        }
    }

    #[must_use]
    pub fn from_profile(profile: &RegionProfile) -> Self {
        Self::new(&profile.state, &profile.country)
    }

    /// Replaces the tier order. Repeated tiers are ignored after their
    /// first appearance.
    #[must_use]
    pub fn with_tiers(mut self, tiers: &[QueryTier]) -> Self {
        let mut seen = BTreeSet::new();
        self.tiers = tiers
            .iter()
            .copied()
            .filter(|t| seen.insert(*t))
            .collect();
        self
    }

    #[must_use]
    pub fn with_strategy(self, strategy: QueryStrategy) -> Self {
        self.with_tiers(strategy.tiers())
    }

    #[must_use]
    pub fn tiers(&self) -> &[QueryTier] {
        &self.tiers
    }

    /// Builds the ordered, deduplicated candidate list.
    ///
    /// Blank inputs count as absent. The last candidate is always
    /// `"<state>, <country>"`.
    #[must_use]
    pub fn build(
        &self,
        street: Option<&str>,
        locality: Option<&str>,
        municipality: Option<&str>,
    ) -> Vec<String> {
        let street = present(street);
        let locality = present(locality);
        let municipality = present(municipality);

        let mut queries: Vec<String> = Vec::with_capacity(self.tiers.len() + 1);

        for tier in &self.tiers {
            let query = match tier {
                QueryTier::Address => street.map(|s| self.compose(&[Some(s), municipality])),
                QueryTier::Locality => locality.map(|l| self.compose(&[Some(l), municipality])),
                QueryTier::Municipality => municipality.map(|m| self.compose(&[Some(m)])),
            };
            queries.extend(query);
        }

        queries.push(self.compose(&[]));

        dedup_preserving_order(queries.iter().map(|q| fold_diacritics(q)))
    }

    /// Builds the plan for a normalized address and its hints.
    #[must_use]
    pub fn plan(&self, normalized: &NormalizedAddress, hints: &RegionHints) -> QueryPlan {
        let street = normalized.street();
        let locality = present(hints.locality.as_deref());

        QueryPlan {
            candidates: self.build(street, locality, hints.municipality.as_deref()),
            has_address_material: street.is_some() || locality.is_some(),
        }
    }

    /// Joins the present parts with the state and country.
    fn compose(&self, parts: &[Option<&str>]) -> String {
        parts
            .iter()
            .flatten()
            .copied()
            .chain([self.state.as_str(), self.country.as_str()])
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builds candidates with the default tier order. Shorthand for
/// `QueryBuilder::new(state, country).build(...)`.
#[must_use]
pub fn build_queries(
    street: Option<&str>,
    locality: Option<&str>,
    municipality: Option<&str>,
    state: &str,
    country: &str,
) -> Vec<String> {
    QueryBuilder::new(state, country).build(street, locality, municipality)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn dedup_preserving_order(queries: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_address;

    fn builder() -> QueryBuilder {
        QueryBuilder::new("Guanajuato", "Mexico")
    }

    #[test]
    fn full_input_produces_all_tiers() {
        let queries = builder().build(
            Some("CALLE HIDALGO 12"),
            Some("San Juan de Otates"),
            Some("León"),
        );
        assert_eq!(
            queries,
            vec![
                "CALLE HIDALGO 12, Leon, Guanajuato, Mexico",
                "San Juan de Otates, Leon, Guanajuato, Mexico",
                "Leon, Guanajuato, Mexico",
                "Guanajuato, Mexico",
            ]
        );
    }

    #[test]
    fn without_municipality_tiers_fall_back_to_state() {
        let queries = builder().build(Some("CALLE HIDALGO 12"), Some("La Estancia"), None);
        assert_eq!(
            queries,
            vec![
                "CALLE HIDALGO 12, Guanajuato, Mexico",
                "La Estancia, Guanajuato, Mexico",
                "Guanajuato, Mexico",
            ]
        );
    }

    #[test]
    fn nothing_present_still_has_state_fallback() {
        assert_eq!(builder().build(None, Some("  "), Some("")), vec!["Guanajuato, Mexico"]);
    }

    #[test]
    fn deduplicates_preserving_first_occurrence() {
        let queries = builder().build(Some("LEON"), Some("León"), Some("LEON"));
        assert_eq!(
            queries,
            vec![
                "LEON, LEON, Guanajuato, Mexico",
                "Leon, LEON, Guanajuato, Mexico",
                "LEON, Guanajuato, Mexico",
                "Guanajuato, Mexico",
            ]
        );

        let queries = builder().build(Some("Leon"), Some("León"), None);
        assert_eq!(queries, vec!["Leon, Guanajuato, Mexico", "Guanajuato, Mexico"]);
    }

    #[test]
    fn keeps_enie_in_candidates() {
        let queries = builder().build(Some("CALLE PEÑA 4"), None, Some("Peñuelas"));
        assert_eq!(queries[0], "CALLE PEÑA 4, Peñuelas, Guanajuato, Mexico");
    }

    #[test]
    fn respects_tier_priority() {
        let street = "CALLE MINA 4";
        let locality = "La Luz";
        let municipality = "Silao";
        let queries = builder().build(Some(street), Some(locality), Some(municipality));

        let position = |needle: &str| queries.iter().position(|q| q.starts_with(needle));
        let address = position(street).unwrap();
        let locality = position(locality).unwrap();
        let municipality = position(municipality).unwrap();
        assert!(address < locality && locality < municipality);
        assert_eq!(queries.last().map(String::as_str), Some("Guanajuato, Mexico"));
    }

    #[test]
    fn rural_strategy_puts_locality_first() {
        let queries = builder().with_strategy(QueryStrategy::Rural).build(
            Some("CALLE MINA 4"),
            Some("La Luz"),
            Some("Silao"),
        );
        assert_eq!(
            queries,
            vec![
                "La Luz, Silao, Guanajuato, Mexico",
                "Silao, Guanajuato, Mexico",
                "CALLE MINA 4, Silao, Guanajuato, Mexico",
                "Guanajuato, Mexico",
            ]
        );
    }

    #[test]
    fn custom_tiers_ignore_repeats() {
        let builder = builder().with_tiers(&[
            QueryTier::Municipality,
            QueryTier::Municipality,
            QueryTier::Address,
        ]);
        assert_eq!(builder.tiers(), &[QueryTier::Municipality, QueryTier::Address]);
        assert_eq!(
            builder.build(Some("CALLE MINA 4"), Some("La Luz"), Some("Silao")),
            vec![
                "Silao, Guanajuato, Mexico",
                "CALLE MINA 4, Silao, Guanajuato, Mexico",
                "Guanajuato, Mexico",
            ]
        );
    }

    #[test]
    fn plan_uses_short_address() {
        let normalized = normalize_address("CALLE HIDALGO 12, COLONIA CENTRO");
        let hints = RegionHints {
            municipality: Some("LEON".to_string()),
            ..RegionHints::default()
        };
        let plan = builder().plan(&normalized, &hints);
        assert!(plan.is_queryable());
        assert_eq!(plan.candidates[0], "CALLE HIDALGO 12, LEON, Guanajuato, Mexico");
    }

    #[test]
    fn plan_without_address_or_locality_is_not_queryable() {
        let hints = RegionHints {
            municipality: Some("LEON".to_string()),
            ..RegionHints::default()
        };
        let plan = builder().plan(&NormalizedAddress::default(), &hints);
        assert!(!plan.has_address_material);
        assert!(!plan.is_queryable());
        assert_eq!(
            plan.candidates,
            vec!["LEON, Guanajuato, Mexico", "Guanajuato, Mexico"]
        );
    }

    #[test]
    fn locality_alone_is_queryable() {
        let hints = RegionHints {
            locality: Some("La Estancia".to_string()),
            ..RegionHints::default()
        };
        let plan = builder().plan(&NormalizedAddress::default(), &hints);
        assert!(plan.is_queryable());
        assert_eq!(plan.candidates[0], "La Estancia, Guanajuato, Mexico");
    }

    #[test]
    fn build_queries_shorthand() {
        assert_eq!(
            build_queries(Some("CALLE HIDALGO 12"), None, Some("LEON"), "Guanajuato", "Mexico")[0],
            "CALLE HIDALGO 12, LEON, Guanajuato, Mexico"
        );
    }

    #[test]
    fn strategy_names() {
        assert_eq!(QueryStrategy::Rural.to_string(), "rural");
        assert_eq!("urban".parse::<QueryStrategy>().unwrap(), QueryStrategy::Urban);
    }
}
