//! Well-Known Text for the four shapes the store understands.
//!
//! `POINT`, `LINESTRING` and `POLYGON` follow the OGC grammar (single outer
//! ring only). `CIRCLE(lon lat, radius)` is a local extension whose radius is
//! a display-projection length.
//!
//! Coordinates are written in `lon lat` order with Rust's shortest
//! round-trip float formatting, so `parse(serialize(g))` reproduces `g`
//! bit for bit (polygon rings come back closed).

use foundation::math::Vec2;
use scene::geometry::{Geometry, closed_ring};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported WKT format: {reason}")]
    UnsupportedFormat { reason: String },
}

fn unsupported(reason: impl Into<String>) -> ParseError {
    ParseError::UnsupportedFormat {
        reason: reason.into(),
    }
}

pub fn parse(text: &str) -> Result<Geometry, ParseError> {
    let text = text.trim();
    let open = text
        .find('(')
        .ok_or_else(|| unsupported("missing opening parenthesis"))?;
    let body = text[open..]
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| unsupported("unbalanced parentheses"))?;

    let keyword = text[..open].trim();
    match keyword.to_ascii_uppercase().as_str() {
        "POINT" => Ok(Geometry::Point(parse_coord(flat(body)?)?)),
        "LINESTRING" => {
            let points = parse_coord_list(flat(body)?)?;
            if points.len() < 2 {
                return Err(unsupported(format!(
                    "LINESTRING needs at least 2 points, got {}",
                    points.len()
                )));
            }
            Ok(Geometry::LineString(points))
        }
        "POLYGON" => {
            let ring = body
                .trim()
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| unsupported("POLYGON ring must be parenthesized"))?;
            let ring = parse_coord_list(flat(ring).map_err(|_| {
                unsupported("POLYGON supports a single outer ring only")
            })?)?;
            Ok(Geometry::Polygon(ring))
        }
        "CIRCLE" => {
            let (center, radius) = flat(body)?
                .split_once(',')
                .ok_or_else(|| unsupported("CIRCLE needs `lon lat, radius`"))?;
            let center = parse_coord(center)?;
            let radius = parse_number(radius.trim())?;
            Ok(Geometry::Circle { center, radius })
        }
        "" => Err(unsupported("missing geometry keyword")),
        other => Err(unsupported(format!("unknown geometry keyword {other:?}"))),
    }
}

pub fn serialize(geometry: &Geometry) -> String {
    match geometry {
        Geometry::Point(p) => format!("POINT({})", coord(*p)),
        Geometry::LineString(points) => format!("LINESTRING({})", coord_list(points)),
        Geometry::Polygon(ring) => format!("POLYGON(({}))", coord_list(&closed_ring(ring))),
        Geometry::Circle { center, radius } => format!("CIRCLE({}, {radius})", coord(*center)),
    }
}

fn coord(p: Vec2) -> String {
    format!("{} {}", p.x, p.y)
}

fn coord_list(points: &[Vec2]) -> String {
    points.iter().map(|p| coord(*p)).collect::<Vec<_>>().join(", ")
}

/// Rejects nested parentheses inside a coordinate body.
fn flat(body: &str) -> Result<&str, ParseError> {
    if body.contains(['(', ')']) {
        Err(unsupported("unexpected nested parentheses"))
    } else {
        Ok(body)
    }
}

fn parse_coord_list(body: &str) -> Result<Vec<Vec2>, ParseError> {
    body.split(',').map(parse_coord).collect()
}

fn parse_coord(pair: &str) -> Result<Vec2, ParseError> {
    let mut fields = pair.split_whitespace();
    let (Some(lon), Some(lat), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(unsupported(format!(
            "expected `lon lat`, got {:?}",
            pair.trim()
        )));
    };
    Ok(Vec2::new(parse_number(lon)?, parse_number(lat)?))
}

fn parse_number(field: &str) -> Result<f64, ParseError> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(unsupported(format!("{field:?} is not a finite number"))),
    }
}
