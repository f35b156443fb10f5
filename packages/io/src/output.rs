//! `GeoJSON` output.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use geojson::FeatureCollection;

use crate::DataError;
use crate::paths::ensure_parent;

/// Writes `collection` as pretty-printed UTF-8 `GeoJSON`, creating the
/// parent directory if needed. Non-ASCII text is written as-is.
///
/// # Errors
///
/// Returns [`DataError`] if the file cannot be created or written.
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), DataError> {
    write_json_pretty(path, collection)?;
    log::info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

/// Writes any serializable value as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`DataError`] if the file cannot be created or written.
pub fn write_json_pretty<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), DataError> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use geojson::{Feature, GeoJson, Geometry, JsonObject};

    use super::*;
    use crate::test_util::scratch_dir;

    #[test]
    fn writes_readable_collection_keeping_non_ascii() {
        let path = scratch_dir("output").join("nested").join("puntos.geojson");

        let mut properties = JsonObject::new();
        properties.insert("LOCALIDAD_GEO".to_string(), "Peñuelas".into());
        let collection = FeatureCollection {
            bbox: None,
            features: vec![
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::Point(vec![-101.68, 21.12]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                },
                Feature {
                    bbox: None,
                    geometry: None,
                    id: None,
                    properties: Some(JsonObject::new()),
                    foreign_members: None,
                },
            ],
            foreign_members: None,
        };

        write_feature_collection(&path, &collection).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Peñuelas"));
        assert!(text.contains("\n  "));

        let parsed = FeatureCollection::try_from(text.parse::<GeoJson>().unwrap()).unwrap();
        assert_eq!(parsed.features.len(), 2);
        assert!(parsed.features[1].geometry.is_none());
    }
}
