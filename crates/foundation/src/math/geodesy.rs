/// WGS84 semi-major axis (meters). Spherical Web Mercator uses it as the sphere radius.
pub const WGS84_A: f64 = 6_378_137.0;

/// Half the Web Mercator world width (meters), i.e. the easting at longitude ±180°.
pub const MERCATOR_HALF_EXTENT: f64 = std::f64::consts::PI * WGS84_A;

/// Latitude clamp (degrees) beyond which the display projection is undefined.
pub const DEFAULT_MAX_LATITUDE_DEG: f64 = 85.06;

/// Longitude range accepted by the projection, in degrees.
pub const MAX_LONGITUDE_DEG: f64 = 180.0;

#[cfg(test)]
mod tests {
    use super::{MERCATOR_HALF_EXTENT, WGS84_A};

    #[test]
    fn half_extent_matches_equatorial_half_circumference() {
        let expected = 20_037_508.342_789_244;
        assert!((MERCATOR_HALF_EXTENT - expected).abs() < 1e-6);
        assert!(MERCATOR_HALF_EXTENT > WGS84_A);
    }
}
