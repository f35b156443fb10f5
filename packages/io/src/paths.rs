//! Canonical file paths under the data directory.
//!
//! Every input and output of a run lives in `<data>/casillas/`. The data
//! directory defaults to the project root's `data/`.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// current directory when the crate is not inside a workspace.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the default `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `casillas/` directory under `data`.
#[must_use]
pub fn casillas_dir(data: &Path) -> PathBuf {
    data.join("casillas")
}

/// Flat CSV export (`SECCION, CASILLA, LOCALIDAD, DOMICILIO`).
#[must_use]
pub fn records_csv_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("ubi_casillas_direcciones.csv")
}

/// Nested JSON export, one entry per section.
#[must_use]
pub fn sections_json_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("casillas_min_por_seccion.json")
}

/// Nested JSON with `DOMICILIO_LIMPIO` / `DOMICILIO_CORTO` added.
#[must_use]
pub fn enriched_json_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("casillas_min_por_seccion_enriquecido.json")
}

/// Skeleton `GeoJSON` (null geometries) written by the prepare step.
#[must_use]
pub fn skeleton_geojson_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("casillas_geo_sin_coords.geojson")
}

/// Section → municipality side table.
#[must_use]
pub fn municipalities_csv_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("secciones_municipio.csv")
}

/// Geocoded output.
#[must_use]
pub fn output_geojson_path(data: &Path) -> PathBuf {
    casillas_dir(data).join("puntos_casillas.geojson")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_casillas_dir() {
        let data = Path::new("/srv/data");
        for path in [
            records_csv_path(data),
            sections_json_path(data),
            enriched_json_path(data),
            skeleton_geojson_path(data),
            municipalities_csv_path(data),
            output_geojson_path(data),
        ] {
            assert_eq!(path.parent(), Some(Path::new("/srv/data/casillas")));
        }
    }

    #[test]
    fn ensure_parent_creates_nested_dirs() {
        let root = std::env::temp_dir().join(format!("casillas_geo_paths_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let file = root.join("a").join("b").join("out.geojson");

        ensure_parent(&file).unwrap();
        assert!(root.join("a").join("b").is_dir());

        ensure_parent(Path::new("relative.geojson")).unwrap();
        let _ = std::fs::remove_dir_all(&root);
    }
}
