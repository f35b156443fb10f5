//! Prepare step: enrich the nested JSON export and write a skeleton
//! `GeoJSON` ready for geocoding.
//!
//! The original `DOMICILIO` of every casilla is left untouched;
//! `DOMICILIO_LIMPIO` and `DOMICILIO_CORTO` are added next to it.

use std::path::{Path, PathBuf};

use casillas_geo_address::normalize::normalize_address;
use casillas_geo_models::NormalizedAddress;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use crate::output::{write_feature_collection, write_json_pretty};
use crate::records::station_id;
use crate::{DataError, require_file, value_text};

/// What the prepare step wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub sections: usize,
    pub casillas: usize,
    pub enriched_path: PathBuf,
    pub skeleton_path: PathBuf,
}

/// Reads the nested JSON at `input`, writes the enriched copy to
/// `enriched_out` and the skeleton collection to `skeleton_out`.
///
/// # Errors
///
/// Returns [`DataError`] if the input is missing or malformed, or an
/// output cannot be written.
pub fn prepare(
    input: &Path,
    enriched_out: &Path,
    skeleton_out: &Path,
) -> Result<PrepareSummary, DataError> {
    require_file(input)?;

    let text = std::fs::read_to_string(input)?;
    let mut root: JsonValue = serde_json::from_str(&text)?;
    let features = enrich(input, &mut root)?;
    let sections = root.as_array().map_or(0, Vec::len);
    let casillas = features.len();

    write_json_pretty(enriched_out, &root)?;
    log::info!("Wrote enriched JSON to {}", enriched_out.display());

    write_feature_collection(
        skeleton_out,
        &FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
    )?;

    Ok(PrepareSummary {
        sections,
        casillas,
        enriched_path: enriched_out.to_path_buf(),
        skeleton_path: skeleton_out.to_path_buf(),
    })
}

/// Adds the derived address fields to every casilla in `root` and returns
/// one skeleton feature per casilla.
fn enrich(path: &Path, root: &mut JsonValue) -> Result<Vec<Feature>, DataError> {
    let rows = root.as_array_mut().ok_or_else(|| DataError::Invalid {
        path: path.to_path_buf(),
        message: "expected a JSON array of sections".to_string(),
    })?;

    let mut features = Vec::new();

    for row in rows {
        let section = value_text(row.get("SECCION"));
        let Some(casillas) = row
            .get_mut("casillas")
            .and_then(JsonValue::as_array_mut)
        else {
            continue;
        };

        for casilla in casillas.iter_mut().filter_map(JsonValue::as_object_mut) {
            let address = value_text(casilla.get("DOMICILIO"));
            let normalized = normalize_address(&address);

            casilla.insert(
                "DOMICILIO_LIMPIO".to_string(),
                normalized.cleaned.clone().into(),
            );
            casilla.insert(
                "DOMICILIO_CORTO".to_string(),
                normalized.short.clone().into(),
            );

            features.push(skeleton_feature(&section, casilla, &address, &normalized));
        }
    }

    Ok(features)
}

fn skeleton_feature(
    section: &str,
    casilla: &JsonObject,
    address: &str,
    normalized: &NormalizedAddress,
) -> Feature {
    let optional = |key: &str| -> JsonValue {
        let text = value_text(casilla.get(key));
        if text.is_empty() {
            JsonValue::Null
        } else {
            text.into()
        }
    };

    let mut properties = JsonObject::new();
    properties.insert("SECCION".to_string(), section.into());
    properties.insert("CASILLA_ID".to_string(), station_id(casilla).into());
    properties.insert("TIPO".to_string(), optional("TIPO"));
    properties.insert("LOCALIDAD".to_string(), optional("LOCALIDAD"));
    properties.insert("DOMICILIO".to_string(), address.into());
    properties.insert(
        "DOMICILIO_LIMPIO".to_string(),
        normalized.cleaned.as_str().into(),
    );
    properties.insert(
        "DOMICILIO_CORTO".to_string(),
        normalized.short.as_str().into(),
    );

    Feature {
        bbox: None,
        geometry: None,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
