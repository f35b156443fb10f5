//! Fixed word tables used by the address normalizer.
//!
//! Every entry is upper-case: the normalizer folds case before any table
//! is consulted.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Street/number abbreviations and their expansions.
///
/// An empty expansion drops the token entirely (number markers carry no
/// information once the number itself follows).
static ABBREVIATIONS: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("NO.", ""),
        ("NUM.", ""),
        ("NÚM.", ""),
        ("NUMERO", ""),
        ("NÚMERO", ""),
        ("#", ""),
        ("C.", "CALLE"),
        ("C/", "CALLE"),
        ("AV", "AVENIDA"),
        ("AV.", "AVENIDA"),
        ("AVE.", "AVENIDA"),
        ("BLVD", "BOULEVARD"),
        ("BLVD.", "BOULEVARD"),
        ("BLVR", "BOULEVARD"),
        ("BLVR.", "BOULEVARD"),
        ("PRIV.", "PRIVADA"),
        ("CARR.", "CARRETERA"),
        ("PROL.", "PROLONGACION"),
    ])
});

/// Phrases that start descriptive, non-structured address content
/// (distances, orientation, cross streets). Everything from the first
/// one onward is discarded.
pub static NOISE_PHRASES: &[&str] = &[
    "A 50 METROS",
    "A 100 METROS",
    "A 200 METROS",
    "A UN COSTADO",
    "FRENTE A",
    "FRENTE AL",
    "ENTRE CALLE",
    "ENTRE LA CALLE",
    "ESQUINA",
    "ESQ.",
    "ESQ",
    "SOBRE LA CARRETERA",
    "SOBRE CARRETERA",
    "LADO DERECHO",
    "LADO IZQUIERDO",
    "A ESPALDAS",
];

/// Words that introduce the neighbourhood part of an address. The short
/// address stops before the first one.
pub static NEIGHBOURHOOD_MARKERS: &[&str] = &[
    "COLONIA",
    "COL.",
    "COL",
    "FRACCIONAMIENTO",
    "FRACC.",
    "FRACC",
    "BARRIO",
    "ZONA",
    "COMUNIDAD",
];

/// "No street number" markers, as regex alternatives.
pub static NO_NUMBER_PATTERNS: &[&str] = &[r"SIN\s+N[UÚ]MERO", r"S\s*/\s*N", r"S\.N\.", "SN"];

/// Expands a single upper-case token.
///
/// Returns `None` when the token should be dropped, the expansion when
/// the token is a known abbreviation, and the token itself otherwise.
/// `C/HIDALGO` and `#12` style prefixes are split off the word they are
/// glued to.
#[must_use]
pub fn expand_token(token: &str) -> Option<String> {
    if let Some(&expanded) = ABBREVIATIONS.get(token) {
        return (!expanded.is_empty()).then(|| expanded.to_string());
    }

    if let Some(rest) = token.strip_prefix("C/") {
        return Some(format!("CALLE {rest}"));
    }

    if let Some(rest) = token.strip_prefix('#') {
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return Some(rest.to_string());
        }
    }

    Some(token.to_string())
}
