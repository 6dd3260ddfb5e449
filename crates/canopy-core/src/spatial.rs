use canopy_parser::schema::{LATITUDE, LONGITUDE, NEIGHBORHOOD};
use canopy_parser::{NeighborhoodLayer, NeighborhoodPolygon, PolygonId};
use geo::{BoundingRect, Intersects, Point, Rect};
use polars::prelude::*;
use tracing::{info, warn};

use crate::completeness::drop_columns_if_present;
use crate::crs::{reproject, CoordinateSystem};
use crate::error::Result;

/// Columns a geometry-backed join would leave behind.
pub const JOIN_ARTIFACT_COLUMNS: [&str; 2] = ["geometry", "index_right"];

/// Point-in-polygon lookup over a fixed set of polygons sharing one CRS.
pub trait PointInPolygonIndex {
    fn crs(&self) -> CoordinateSystem;

    /// Returns the polygon containing `point` (interior or boundary). Points
    /// must already be expressed in [`PointInPolygonIndex::crs`].
    fn locate(&self, point: Point<f64>) -> Option<PolygonId>;

    fn name(&self, id: PolygonId) -> Option<&str>;
}

struct IndexedPolygon {
    polygon: NeighborhoodPolygon,
    bounds: Option<Rect<f64>>,
}

/// Linear scan with a bounding-box prefilter. Polygons are kept in ascending
/// id order so overlapping matches resolve to the lowest id.
pub struct NeighborhoodIndex {
    crs: CoordinateSystem,
    entries: Vec<IndexedPolygon>,
}

impl NeighborhoodIndex {
    pub fn new(mut polygons: Vec<NeighborhoodPolygon>, crs: CoordinateSystem) -> Self {
        polygons.sort_by_key(|polygon| polygon.id);
        let entries = polygons
            .into_iter()
            .map(|polygon| IndexedPolygon {
                bounds: polygon.geometry.bounding_rect(),
                polygon,
            })
            .collect();
        Self { crs, entries }
    }

    /// Builds the index from a parsed layer. A layer without a declared CRS
    /// is RFC 7946 GeoJSON, i.e. WGS 84 longitude/latitude.
    pub fn from_layer(layer: NeighborhoodLayer) -> Result<Self> {
        let crs = match layer.crs_name.as_deref() {
            Some(name) => CoordinateSystem::from_name(name)?,
            None => CoordinateSystem::Wgs84,
        };

        if !layer.skipped_features.is_empty() {
            warn!(
                features = ?layer.skipped_features,
                "skipped neighborhood features without geometry"
            );
        }

        Ok(Self::new(layer.polygons, crs))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn polygons(&self) -> impl Iterator<Item = &NeighborhoodPolygon> {
        self.entries.iter().map(|entry| &entry.polygon)
    }
}

fn rect_covers(rect: &Rect<f64>, point: Point<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
}

impl PointInPolygonIndex for NeighborhoodIndex {
    fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    fn locate(&self, point: Point<f64>) -> Option<PolygonId> {
        self.entries
            .iter()
            .filter(|entry| entry.bounds.is_some_and(|rect| rect_covers(&rect, point)))
            .find(|entry| entry.polygon.geometry.intersects(&point))
            .map(|entry| entry.polygon.id)
    }

    fn name(&self, id: PolygonId) -> Option<&str> {
        self.entries
            .binary_search_by_key(&id, |entry| entry.polygon.id)
            .ok()
            .and_then(|pos| self.entries[pos].polygon.name.as_deref())
    }
}

/// Attaches the containing neighborhood's name to every row as
/// `neighborhood`. Points are built as (longitude, latitude) in `source_crs`
/// and converted to the index CRS first. Unmatched rows keep a null
/// neighborhood; nothing is filtered here.
pub fn join_neighborhoods<I>(
    df: &DataFrame,
    index: &I,
    source_crs: CoordinateSystem,
) -> Result<DataFrame>
where
    I: PointInPolygonIndex + ?Sized,
{
    let latitudes = df.column(LATITUDE)?.as_materialized_series().f64()?;
    let longitudes = df.column(LONGITUDE)?.as_materialized_series().f64()?;
    let target_crs = index.crs();

    let mut neighborhoods: Vec<Option<&str>> = Vec::with_capacity(df.height());
    for (longitude, latitude) in longitudes.into_iter().zip(latitudes.into_iter()) {
        let name = match (longitude, latitude) {
            (Some(x), Some(y)) => {
                let point = reproject(Point::new(x, y), source_crs, target_crs);
                index.locate(point).and_then(|id| index.name(id))
            }
            _ => None,
        };
        neighborhoods.push(name);
    }

    let matched = neighborhoods.iter().filter(|name| name.is_some()).count();

    let mut output = drop_columns_if_present(df, &JOIN_ARTIFACT_COLUMNS)?;
    output.with_column(Series::new(NEIGHBORHOOD.into(), neighborhoods))?;

    info!(
        rows = df.height(),
        matched,
        source_crs = %source_crs,
        target_crs = %target_crs,
        "joined trees to neighborhoods"
    );

    Ok(output)
}

/// Drops rows whose point fell outside every neighborhood.
pub fn drop_unmatched(df: &DataFrame) -> Result<DataFrame> {
    let output = df
        .clone()
        .lazy()
        .filter(col(NEIGHBORHOOD).is_not_null())
        .collect()?;

    info!(
        dropped_rows = df.height() - output.height(),
        "dropped trees outside every neighborhood"
    );

    Ok(output)
}
