//! GeoJSON feature assembly.
//!
//! Every record becomes exactly one feature. The geometry is a point only
//! for `OK` results; the property set is the same for every feature so
//! downstream tools see a fixed schema.

use casillas_geo_models::{NormalizedAddress, Record, RegionHints, ResolutionResult};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

/// Property names written on every feature, in output order.
pub const PROPERTY_NAMES: &[&str] = &[
    "SECCION",
    "CASILLA_ID",
    "TIPO",
    "LOCALIDAD",
    "DOMICILIO",
    "DOMICILIO_LIMPIO",
    "DOMICILIO_CORTO",
    "CP",
    "MUNICIPIO",
    "LOCALIDAD_GEO",
    "GEOCOD_STATUS",
    "GEOCOD_QUERY",
];

/// Builds the feature for one record.
#[must_use]
pub fn assemble(
    record: &Record,
    normalized: &NormalizedAddress,
    hints: &RegionHints,
    resolution: &ResolutionResult,
) -> Feature {
    let geometry = resolution.coordinate.map(|c| {
        let point = geo::Point::new(c.longitude, c.latitude);
        Geometry::new(geojson::Value::from(&point))
    });

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties(record, normalized, hints, resolution)),
        foreign_members: None,
    }
}

fn properties(
    record: &Record,
    normalized: &NormalizedAddress,
    hints: &RegionHints,
    resolution: &ResolutionResult,
) -> JsonObject {
    let values: [JsonValue; 12] = [
        record.section.clone().into(),
        record.station.clone().into(),
        record.kind.clone().into(),
        record.locality.clone().into(),
        record.address.clone().into(),
        normalized.cleaned.clone().into(),
        normalized.short.clone().into(),
        hints.postal_code.clone().into(),
        hints.municipality.clone().into(),
        hints.locality.clone().into(),
        resolution.status.to_string().into(),
        resolution.query.clone().into(),
    ];

    PROPERTY_NAMES
        .iter()
        .map(|name| (*name).to_string())
        .zip(values)
        .collect()
}

/// Wraps features into a collection, keeping their order.
#[must_use]
pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use casillas_geo_models::{Coordinate, GeocodeStatus};

    use super::*;

    fn record() -> Record {
        Record {
            section: "1234".to_string(),
            station: "B1".to_string(),
            locality: None,
            address: "CALLE HIDALGO 12, COLONIA CENTRO".to_string(),
            kind: Some("BASICA".to_string()),
        }
    }

    fn normalized() -> NormalizedAddress {
        NormalizedAddress {
            cleaned: "CALLE HIDALGO 12, COLONIA CENTRO".to_string(),
            short: "CALLE HIDALGO 12".to_string(),
        }
    }

    #[test]
    fn ok_result_has_point_geometry() {
        let hints = RegionHints {
            municipality: Some("Leon".to_string()),
            ..RegionHints::default()
        };
        let resolution = ResolutionResult::matched(
            "CALLE HIDALGO 12, Leon, Guanajuato, Mexico".to_string(),
            Coordinate::new(-101.68, 21.12),
        );

        let feature = assemble(&record(), &normalized(), &hints, &resolution);

        let geometry = feature.geometry.as_ref().unwrap();
        assert_eq!(
            geometry.value,
            geojson::Value::Point(vec![-101.68, 21.12])
        );
        assert_eq!(
            feature.property("GEOCOD_STATUS").and_then(JsonValue::as_str),
            Some("OK")
        );
        assert_eq!(
            feature.property("DOMICILIO_CORTO").and_then(JsonValue::as_str),
            Some("CALLE HIDALGO 12")
        );
        assert_eq!(
            feature.property("MUNICIPIO").and_then(JsonValue::as_str),
            Some("Leon")
        );
    }

    #[test]
    fn failed_results_have_null_geometry_and_every_property() {
        for resolution in [
            ResolutionResult::no_address(),
            ResolutionResult::no_match("Guanajuato, Mexico".to_string()),
        ] {
            let feature = assemble(
                &record(),
                &NormalizedAddress::default(),
                &RegionHints::default(),
                &resolution,
            );

            assert!(feature.geometry.is_none());
            let properties = feature.properties.as_ref().unwrap();
            assert_eq!(properties.len(), PROPERTY_NAMES.len());
            for name in PROPERTY_NAMES {
                assert!(properties.contains_key(*name), "missing {name}");
            }
            assert_eq!(properties["CP"], JsonValue::Null);
            assert_eq!(
                properties["GEOCOD_STATUS"],
                JsonValue::from(resolution.status.to_string())
            );
        }
    }

    #[test]
    fn no_address_has_empty_query() {
        let feature = assemble(
            &record(),
            &NormalizedAddress::default(),
            &RegionHints::default(),
            &ResolutionResult::no_address(),
        );
        assert_eq!(
            feature.property("GEOCOD_STATUS").and_then(JsonValue::as_str),
            Some(GeocodeStatus::SinDireccion.as_ref())
        );
        assert_eq!(
            feature.property("GEOCOD_QUERY").and_then(JsonValue::as_str),
            Some("")
        );
    }

    #[test]
    fn collection_preserves_order() {
        let features: Vec<Feature> = ["1", "2", "3"]
            .iter()
            .map(|section| {
                let record = Record {
                    section: (*section).to_string(),
                    ..record()
                };
                assemble(
                    &record,
                    &NormalizedAddress::default(),
                    &RegionHints::default(),
                    &ResolutionResult::no_address(),
                )
            })
            .collect();

        let collection = feature_collection(features);
        let sections: Vec<&str> = collection
            .features
            .iter()
            .filter_map(|f| f.property("SECCION").and_then(JsonValue::as_str))
            .collect();
        assert_eq!(sections, vec!["1", "2", "3"]);
    }
}
