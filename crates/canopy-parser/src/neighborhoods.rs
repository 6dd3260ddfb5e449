use std::fs;
use std::path::Path;

use geo::{MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::errors::IngestError;
use crate::model::{NeighborhoodLayer, NeighborhoodPolygon, PolygonId};

pub fn read_neighborhoods(
    path: impl AsRef<Path>,
    name_property: &str,
) -> Result<NeighborhoodLayer, IngestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_neighborhoods(&content, name_property)
}

/// Parses a GeoJSON FeatureCollection of neighborhood polygons. Each feature
/// is named by its `name_property` property; features are numbered in file
/// order, counting features skipped for lacking a geometry.
pub fn parse_neighborhoods(
    content: &str,
    name_property: &str,
) -> Result<NeighborhoodLayer, IngestError> {
    let collection = match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(_) => return Err(IngestError::NotAFeatureCollection { found: "Feature" }),
        GeoJson::Geometry(_) => {
            return Err(IngestError::NotAFeatureCollection { found: "Geometry" })
        }
    };

    let crs_name = declared_crs(collection.foreign_members.as_ref());
    let mut layer = NeighborhoodLayer {
        polygons: Vec::with_capacity(collection.features.len()),
        crs_name,
        skipped_features: Vec::new(),
    };

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature_name(&feature, name_property, index)?;

        let Some(geometry) = feature.geometry else {
            layer.skipped_features.push(index);
            continue;
        };

        let geometry = match geometry.value {
            value @ GeoJsonValue::Polygon(_) => MultiPolygon::new(vec![Polygon::try_from(value)?]),
            value @ GeoJsonValue::MultiPolygon(_) => MultiPolygon::try_from(value)?,
            other => {
                return Err(IngestError::Feature {
                    index,
                    message: format!(
                        "expected Polygon or MultiPolygon geometry, found {}",
                        geometry_kind(&other)
                    ),
                })
            }
        };

        layer.polygons.push(NeighborhoodPolygon {
            id: PolygonId(index),
            name,
            geometry,
        });
    }

    Ok(layer)
}

fn feature_name(
    feature: &Feature,
    name_property: &str,
    index: usize,
) -> Result<Option<String>, IngestError> {
    match feature.property(name_property) {
        Some(JsonValue::String(text)) => Ok(Some(text.clone())),
        Some(JsonValue::Number(number)) => Ok(Some(number.to_string())),
        Some(JsonValue::Null) => Ok(None),
        Some(other) => Err(IngestError::Feature {
            index,
            message: format!("non-string value {other} for '{name_property}' property"),
        }),
        None => Err(IngestError::Feature {
            index,
            message: format!("missing '{name_property}' property"),
        }),
    }
}

/// Reads the pre-RFC 7946 `crs` member, e.g.
/// `{"type": "name", "properties": {"name": "EPSG:4326"}}`.
fn declared_crs(foreign_members: Option<&JsonObject>) -> Option<String> {
    foreign_members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn geometry_kind(value: &GeoJsonValue) -> &'static str {
    match value {
        GeoJsonValue::Point(_) => "Point",
        GeoJsonValue::MultiPoint(_) => "MultiPoint",
        GeoJsonValue::LineString(_) => "LineString",
        GeoJsonValue::MultiLineString(_) => "MultiLineString",
        GeoJsonValue::Polygon(_) => "Polygon",
        GeoJsonValue::MultiPolygon(_) => "MultiPolygon",
        GeoJsonValue::GeometryCollection(_) => "GeometryCollection",
    }
}
