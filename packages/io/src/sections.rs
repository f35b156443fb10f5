//! Section → municipality side table.

use std::path::Path;

use casillas_geo_models::{SectionMunicipalities, section_key};
use serde::Deserialize;

use crate::{DataError, require_file};

#[derive(Debug, Deserialize)]
struct SectionRow {
    #[serde(rename = "SECCION", default)]
    section: String,
    #[serde(rename = "MUNICIPIO", default)]
    municipality: String,
}

/// Reads a `SECCION, MUNICIPIO` CSV.
///
/// Section ids are stored in [`section_key`] form. Rows missing either
/// column are skipped.
///
/// # Errors
///
/// Returns [`DataError::MissingInput`] if the file does not exist, or a
/// CSV error if it cannot be parsed.
pub fn read_section_municipalities(path: &Path) -> Result<SectionMunicipalities, DataError> {
    require_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut table = SectionMunicipalities::new();
    for result in reader.deserialize::<SectionRow>() {
        let row = result?;
        let section = section_key(&row.section);
        let municipality = row.municipality.trim();
        if section.is_empty() || municipality.is_empty() {
            continue;
        }
        table.insert(section, municipality.to_string());
    }

    log::info!(
        "Loaded {} section -> municipality entries from {}",
        table.len(),
        path.display()
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::scratch_dir;

    #[test]
    fn reads_and_normalizes_section_keys() {
        let path = scratch_dir("sections").join("secciones_municipio.csv");
        std::fs::write(
            &path,
            "SECCION,MUNICIPIO\n0042, LEON\n1234,San Francisco del Rincón\n,SILAO\n99,\n",
        )
        .unwrap();

        let table = read_section_municipalities(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("42").map(String::as_str), Some("LEON"));
        assert_eq!(
            table.get(&section_key("01234")).map(String::as_str),
            Some("San Francisco del Rincón")
        );
    }

    #[test]
    fn missing_table_is_fatal() {
        let path = scratch_dir("sections_missing").join("secciones_municipio.csv");
        assert!(matches!(
            read_section_municipalities(&path),
            Err(DataError::MissingInput { .. })
        ));
    }
}
