use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;

use geo::Point;
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Spherical Mercator radius (WGS 84 semi-major axis).
const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Web Mercator is undefined past this latitude.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CoordinateSystem {
    /// Longitude/latitude in degrees (EPSG:4326 axis order as used by GeoJSON).
    Wgs84,
    /// EPSG:3857 metres.
    WebMercator,
}

impl CoordinateSystem {
    /// Resolves a CRS identifier as found in configuration or in a GeoJSON
    /// `crs` member. Unknown identifiers are an error, never a guess.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_uppercase();

        if normalized == "WGS84" || normalized.ends_with("CRS84") {
            return Ok(CoordinateSystem::Wgs84);
        }

        if normalized.contains("EPSG") {
            let code = normalized.rsplit(':').next().unwrap_or_default();
            match code {
                "4326" => return Ok(CoordinateSystem::Wgs84),
                "3857" | "900913" | "3785" => return Ok(CoordinateSystem::WebMercator),
                _ => {}
            }
        }

        Err(PipelineError::UnsupportedCrs(name.to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoordinateSystem::Wgs84 => "EPSG:4326",
            CoordinateSystem::WebMercator => "EPSG:3857",
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn reproject(point: Point<f64>, from: CoordinateSystem, to: CoordinateSystem) -> Point<f64> {
    match (from, to) {
        (CoordinateSystem::Wgs84, CoordinateSystem::WebMercator) => wgs84_to_web_mercator(point),
        (CoordinateSystem::WebMercator, CoordinateSystem::Wgs84) => web_mercator_to_wgs84(point),
        _ => point,
    }
}

fn wgs84_to_web_mercator(point: Point<f64>) -> Point<f64> {
    let latitude = point
        .y()
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = EARTH_RADIUS_M * point.x().to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + latitude / 2.0).tan().ln();
    Point::new(x, y)
}

fn web_mercator_to_wgs84(point: Point<f64>) -> Point<f64> {
    let longitude = (point.x() / EARTH_RADIUS_M).to_degrees();
    let latitude = (2.0 * (point.y() / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    Point::new(longitude, latitude)
}
