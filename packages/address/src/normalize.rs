//! Address text normalization.
//!
//! Polling-station addresses come out of scanned PDFs and spreadsheets in
//! many shapes:
//! - Labelled: `"DOMICILIO: CALLE HIDALGO NO. 12"`
//! - With directions: `"ESCUELA PRIMARIA FRENTE A LA PLAZA"`
//! - Without a number: `"CALLE MORELOS S/N, COL. CENTRO"`
//!
//! [`normalize`] reduces these to the structured head of the address.
//! [`fold_diacritics`] is applied afterwards to geocoder queries, because
//! Nominatim handles `Ñ` correctly but is inconsistent with other accented
//! letters.

use std::sync::LazyLock;

use casillas_geo_models::NormalizedAddress;
use regex::Regex;
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

use crate::tables::{self, NEIGHBOURHOOD_MARKERS, NO_NUMBER_PATTERNS, NOISE_PHRASES};

/// Leading `DOMICILIO:` label, possibly repeated.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:DOMICILIO\s*:\s*)+").expect("valid regex"));

/// Earliest noise phrase, as a whole word.
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(NOISE_PHRASES));

/// Earliest neighbourhood marker, as a whole word.
static NEIGHBOURHOOD_RE: LazyLock<Regex> =
    LazyLock::new(|| word_alternation(NEIGHBOURHOOD_MARKERS));

/// "No number" markers, as whole words. A trailing `.` or `-` belongs to
/// the marker.
static NO_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|\s)(?:{})(?:[\s,;.\-]|$)",
        NO_NUMBER_PATTERNS.join("|")
    ))
    .expect("valid regex")
});

/// Whitespace before punctuation left behind by token removal.
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,;])").expect("valid regex"));

/// Repeated separators (`", ,"`) left behind by token removal.
static REPEATED_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(?:\s*,)+").expect("valid regex"));

/// Placeholders for `ñ`/`Ñ` while accents are stripped. Private-use code
/// points have no decomposition.
const ENIE_LOWER_PLACEHOLDER: char = '\u{E000}';
const ENIE_UPPER_PLACEHOLDER: char = '\u{E001}';

/// Characters trimmed from both ends of cleaned text.
const EDGE_PUNCTUATION: &[char] = &[',', '.', ';', '-', ' '];

/// Builds a regex matching any of `words` delimited by whitespace,
/// separators, or the text boundaries.
fn word_alternation(words: &[&str]) -> Regex {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&format!(
        r"(?:^|[\s,;])(?:{})(?:[\s,;.]|$)",
        alternatives.join("|")
    ))
    .expect("valid regex")
}

/// Collapses whitespace runs into single spaces and trims.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates `text` at the start of the first `re` match.
fn truncate_at(text: &str, re: &Regex) -> String {
    re.find(text)
        .map_or(text, |m| &text[..m.start()])
        .to_string()
}

/// Applies the abbreviation table token by token, keeping separators
/// glued to the end of a token.
fn expand_abbreviations(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();

    for token in text.split_whitespace() {
        let core = token.trim_end_matches([',', ';']);
        let tail = &token[core.len()..];

        // "SIN NUMERO" is a no-number marker, stripped as a whole later.
        if matches!(core, "NUMERO" | "NÚMERO") && out.last().is_some_and(|t| t == "SIN") {
            out.push(token.to_string());
            continue;
        }

        match tables::expand_token(core) {
            Some(expanded) => out.push(format!("{expanded}{tail}")),
            None if !tail.is_empty() => out.push(tail.to_string()),
            None => {}
        }
    }

    out.join(" ")
}

/// Strips "no number" markers such as `S/N` and `SIN NUMERO`.
fn strip_no_number(text: &str) -> String {
    let mut current = text.to_string();
    // Adjacent markers share a delimiter, so one pass can miss the second.
    loop {
        let next = NO_NUMBER_RE
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                let m = &caps[0];
                if m.ends_with(',') || m.ends_with(';') {
                    m[m.len() - 1..].to_string()
                } else {
                    " ".to_string()
                }
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Tidies separators and trims punctuation at both ends.
fn tidy(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let collapsed = SPACE_BEFORE_PUNCT_RE.replace_all(&collapsed, "$1");
    let collapsed = REPEATED_SEPARATOR_RE.replace_all(&collapsed, ",");
    collapsed.trim_matches(EDGE_PUNCTUATION).to_string()
}

/// Normalizes a raw address for geocoding.
///
/// The pipeline:
/// 1. Uppercase, collapse whitespace, trim
/// 2. Strip a leading `DOMICILIO:` label
/// 3. Expand abbreviations (`NO.` dropped, `C/` → `CALLE`, `AV.` → `AVENIDA`, ...)
/// 4. Truncate at the first noise phrase (`FRENTE A`, `ESQUINA`, ...)
/// 5. Strip "no number" markers (`S/N`, `SIN NUMERO`)
/// 6. Trim residual punctuation
///
/// Empty input yields an empty string. Normalizing the output again
/// returns it unchanged.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let upper = collapse_whitespace(&raw.to_uppercase());
    let unlabelled = LABEL_RE.replace(&upper, "");
    let expanded = expand_abbreviations(&unlabelled);
    let mut current = tidy(&truncate_at(&expanded, &NOISE_RE));
    // Marker removal can join two words into a noise phrase, and trimming
    // can expose a marker at the end.
    loop {
        let numbered = strip_no_number(&current);
        let next = tidy(&truncate_at(&tidy(&numbered), &NOISE_RE));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Derives the short address: `cleaned` cut before the first
/// neighbourhood marker (`COLONIA`, `FRACC.`, `BARRIO`, ...).
///
/// The result is always a prefix of `cleaned`, or empty when the address
/// starts with a marker.
#[must_use]
pub fn short_address(cleaned: &str) -> String {
    truncate_at(cleaned, &NEIGHBOURHOOD_RE)
        .trim_matches(EDGE_PUNCTUATION)
        .to_string()
}

/// Normalizes a raw address into both its cleaned and short forms.
#[must_use]
pub fn normalize_address(raw: &str) -> NormalizedAddress {
    let cleaned = normalize(raw);
    let short = short_address(&cleaned);
    NormalizedAddress { cleaned, short }
}

/// Strips diacritics from `text` except for `ñ`/`Ñ`.
///
/// `ñ`/`Ñ` are swapped for placeholder characters, the text is
/// NFD-decomposed and combining marks are dropped, then the placeholders
/// are swapped back. Whitespace is collapsed; case is preserved.
#[must_use]
pub fn fold_diacritics(text: &str) -> String {
    let collapsed = collapse_whitespace(text);

    let marked: String = collapsed
        .nfc()
        .map(|c| match c {
            'ñ' => ENIE_LOWER_PLACEHOLDER,
            'Ñ' => ENIE_UPPER_PLACEHOLDER,
            other => other,
        })
        .collect();

    marked
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            ENIE_LOWER_PLACEHOLDER => 'ñ',
            ENIE_UPPER_PLACEHOLDER => 'Ñ',
            other => other,
        })
        .collect()
}

/// [`normalize`] followed by [`fold_diacritics`].
#[must_use]
pub fn normalize_folded(raw: &str) -> String {
    fold_diacritics(&normalize(raw))
}

/// Title-cases `text`: the first letter of every run of letters is
/// upper-cased, the rest lower-cased.
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
