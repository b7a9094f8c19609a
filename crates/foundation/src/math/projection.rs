//! Spherical Web Mercator, the display projection of the map.
//!
//! Geographic coordinates are `(lon, lat)` in degrees; display coordinates are
//! `(x, y)` in metres on a sphere of radius [`WGS84_A`]. The pair is an exact
//! inverse inside the latitude clamp and refuses anything outside it.

use thiserror::Error;

use super::geodesy::{DEFAULT_MAX_LATITUDE_DEG, MAX_LONGITUDE_DEG, MERCATOR_HALF_EXTENT, WGS84_A};
use super::vec::Vec2;

/// Slack allowed on display-frame bounds so that values produced by
/// `to_display` at the very edge of the domain are accepted back.
const DISPLAY_EDGE_SLACK_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TransformError {
    #[error("{axis} {value} is outside the projection domain")]
    OutOfRange { axis: &'static str, value: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WebMercator {
    /// Absolute latitude limit in degrees.
    pub max_lat_deg: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            max_lat_deg: DEFAULT_MAX_LATITUDE_DEG,
        }
    }
}

impl WebMercator {
    pub fn with_max_latitude(max_lat_deg: f64) -> Self {
        Self { max_lat_deg }
    }

    /// Northing of the latitude clamp.
    pub fn max_northing(&self) -> f64 {
        northing(self.max_lat_deg.to_radians())
    }

    pub fn to_display(&self, geographic: Vec2) -> Result<Vec2, TransformError> {
        let Vec2 { x: lon, y: lat } = geographic;
        if !(lon.abs() <= MAX_LONGITUDE_DEG) {
            return Err(TransformError::OutOfRange {
                axis: "longitude",
                value: lon,
            });
        }
        if !(lat.abs() <= self.max_lat_deg) {
            return Err(TransformError::OutOfRange {
                axis: "latitude",
                value: lat,
            });
        }

        Ok(Vec2::new(WGS84_A * lon.to_radians(), northing(lat.to_radians())))
    }

    pub fn to_geographic(&self, display: Vec2) -> Result<Vec2, TransformError> {
        let Vec2 { x, y } = display;
        if !(x.abs() <= MERCATOR_HALF_EXTENT + DISPLAY_EDGE_SLACK_M) {
            return Err(TransformError::OutOfRange {
                axis: "easting",
                value: x,
            });
        }
        if !(y.abs() <= self.max_northing() + DISPLAY_EDGE_SLACK_M) {
            return Err(TransformError::OutOfRange {
                axis: "northing",
                value: y,
            });
        }

        let lon = (x / WGS84_A).to_degrees().clamp(-MAX_LONGITUDE_DEG, MAX_LONGITUDE_DEG);
        let lat = (2.0 * (y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        Ok(Vec2::new(lon, lat))
    }
}

fn northing(lat_rad: f64) -> f64 {
    WGS84_A * (std::f64::consts::FRAC_PI_4 + lat_rad / 2.0).tan().ln()
}

/// Project `(lon, lat)` degrees with the default clamp.
pub fn to_display(lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
    let p = WebMercator::default().to_display(Vec2::new(lon, lat))?;
    Ok((p.x, p.y))
}

/// Unproject `(x, y)` metres with the default clamp.
pub fn to_geographic(x: f64, y: f64) -> Result<(f64, f64), TransformError> {
    let p = WebMercator::default().to_geographic(Vec2::new(x, y))?;
    Ok((p.x, p.y))
}
