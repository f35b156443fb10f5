//! Casilla record readers.
//!
//! Three input shapes are accepted:
//!
//! - flat CSV: `SECCION, CASILLA, LOCALIDAD, DOMICILIO[, TIPO]`
//! - nested JSON: `[{ "SECCION": .., "casillas": [{ "CLAVE": .., "TIPO": .., "DOMICILIO": .. }] }]`
//! - skeleton `GeoJSON` written by the prepare step

use std::path::Path;

use casillas_geo_models::Record;
use geojson::{FeatureCollection, GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{DataError, require_file, value_text};

/// Input file shape.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InputFormat {
    /// Flat CSV, one row per casilla.
    Csv,
    /// Nested JSON grouped by section.
    Json,
    /// `GeoJSON` `FeatureCollection`.
    Geojson,
}

impl InputFormat {
    /// Guesses the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "geojson" => Some(Self::Geojson),
            _ => None,
        }
    }
}

/// Reads records from `path` in the given format.
///
/// # Errors
///
/// Returns [`DataError::MissingInput`] if the file does not exist, or a
/// parse error if it does not match `format`.
pub fn read_records(path: &Path, format: InputFormat) -> Result<Vec<Record>, DataError> {
    require_file(path)?;

    let records = match format {
        InputFormat::Csv => read_csv(path)?,
        InputFormat::Json => read_sections_json(path)?,
        InputFormat::Geojson => read_skeleton_geojson(path)?,
    };

    log::info!(
        "Read {} casillas from {} ({format})",
        records.len(),
        path.display()
    );

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "SECCION", default)]
    section: String,
    #[serde(rename = "CASILLA", default)]
    station: String,
    #[serde(rename = "LOCALIDAD", default)]
    locality: String,
    #[serde(rename = "DOMICILIO", default)]
    address: String,
    #[serde(rename = "TIPO", default)]
    kind: String,
}

impl From<CsvRow> for Record {
    fn from(row: CsvRow) -> Self {
        Self {
            section: row.section,
            station: row.station,
            locality: non_empty(row.locality),
            address: row.address,
            kind: non_empty(row.kind),
        }
    }
}

fn read_csv(path: &Path) -> Result<Vec<Record>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        records.push(Record::from(result?));
    }
    Ok(records)
}

/// Station id of a nested-JSON casilla: `CLAVE`, else `CASILLA`, else `ID`.
pub(crate) fn station_id(casilla: &JsonObject) -> String {
    ["CLAVE", "CASILLA", "ID"]
        .iter()
        .map(|key| value_text(casilla.get(*key)))
        .find(|id| !id.is_empty())
        .unwrap_or_default()
}

/// Parses the nested JSON export into `(section, casilla object)` pairs.
pub(crate) fn sections(
    path: &Path,
    root: &serde_json::Value,
) -> Result<Vec<(String, JsonObject)>, DataError> {
    let rows = root.as_array().ok_or_else(|| DataError::Invalid {
        path: path.to_path_buf(),
        message: "expected a JSON array of sections".to_string(),
    })?;

    let mut out = Vec::new();
    for row in rows {
        let section = value_text(row.get("SECCION"));
        let Some(casillas) = row.get("casillas").and_then(serde_json::Value::as_array) else {
            log::debug!("Section {section} has no casillas");
            continue;
        };
        for casilla in casillas {
            if let Some(object) = casilla.as_object() {
                out.push((section.clone(), object.clone()));
            }
        }
    }
    Ok(out)
}

fn read_sections_json(path: &Path) -> Result<Vec<Record>, DataError> {
    let text = std::fs::read_to_string(path)?;
    let root: serde_json::Value = serde_json::from_str(&text)?;

    Ok(sections(path, &root)?
        .into_iter()
        .map(|(section, casilla)| Record {
            station: station_id(&casilla),
            locality: non_empty(value_text(casilla.get("LOCALIDAD"))),
            address: value_text(casilla.get("DOMICILIO")),
            kind: non_empty(value_text(casilla.get("TIPO"))),
            section,
        })
        .collect())
}

fn read_skeleton_geojson(path: &Path) -> Result<Vec<Record>, DataError> {
    let text = std::fs::read_to_string(path)?;
    let collection = FeatureCollection::try_from(text.parse::<GeoJson>()?)?;

    Ok(collection
        .features
        .iter()
        .map(|feature| {
            let property = |key: &str| value_text(feature.property(key));
            Record {
                section: property("SECCION"),
                station: property("CASILLA_ID"),
                locality: non_empty(property("LOCALIDAD")),
                address: property("DOMICILIO"),
                kind: non_empty(property("TIPO")),
            }
        })
        .collect())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
