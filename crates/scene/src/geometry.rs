use foundation::math::{TransformError, Vec2, WebMercator};
use thiserror::Error;

/// Shape kinds a user can draw and the store can persist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Point,
    LineString,
    Polygon,
    Circle,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Point => "Point",
            ShapeKind::LineString => "LineString",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::Circle => "Circle",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" => Ok(ShapeKind::Point),
            "linestring" | "line" => Ok(ShapeKind::LineString),
            "polygon" => Ok(ShapeKind::Polygon),
            "circle" => Ok(ShapeKind::Circle),
            other => Err(format!("unknown shape kind: {other}")),
        }
    }
}

/// A drawn or persisted shape.
///
/// The same type carries both frames: geographic (`x` = lon, `y` = lat) and
/// display (Web Mercator metres). Circle radius is always in display metres.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    LineString(Vec<Vec2>),
    /// Single outer ring, open or explicitly closed.
    Polygon(Vec<Vec2>),
    Circle { center: Vec2, radius: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{kind} needs at least {min} vertices, got {got}")]
    TooFewVertices {
        kind: ShapeKind,
        min: usize,
        got: usize,
    },
    #[error("coordinate values must be finite")]
    NonFinite,
    #[error("circle radius must be a finite non-negative length, got {0}")]
    InvalidRadius(f64),
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Point(_) => ShapeKind::Point,
            Geometry::LineString(_) => ShapeKind::LineString,
            Geometry::Polygon(_) => ShapeKind::Polygon,
            Geometry::Circle { .. } => ShapeKind::Circle,
        }
    }

    /// Checks the shape is one the codec can write and read back.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Geometry::Point(p) => ensure_finite(std::slice::from_ref(p)),
            Geometry::LineString(points) => {
                ensure_finite(points)?;
                ensure_vertices(ShapeKind::LineString, 2, points.len())
            }
            Geometry::Polygon(ring) => {
                ensure_finite(ring)?;
                ensure_vertices(ShapeKind::Polygon, 3, open_ring(ring).len())
            }
            Geometry::Circle { center, radius } => {
                ensure_finite(std::slice::from_ref(center))?;
                if radius.is_finite() && *radius >= 0.0 {
                    Ok(())
                } else {
                    Err(GeometryError::InvalidRadius(*radius))
                }
            }
        }
    }

    /// Applies `f` to every coordinate. Circle radius is left untouched.
    pub fn try_map_coords<E>(
        &self,
        mut f: impl FnMut(Vec2) -> Result<Vec2, E>,
    ) -> Result<Geometry, E> {
        Ok(match self {
            Geometry::Point(p) => Geometry::Point(f(*p)?),
            Geometry::LineString(points) => {
                Geometry::LineString(points.iter().map(|p| f(*p)).collect::<Result<_, _>>()?)
            }
            Geometry::Polygon(ring) => {
                Geometry::Polygon(ring.iter().map(|p| f(*p)).collect::<Result<_, _>>()?)
            }
            Geometry::Circle { center, radius } => Geometry::Circle {
                center: f(*center)?,
                radius: *radius,
            },
        })
    }

    pub fn to_display(&self, projection: &WebMercator) -> Result<Geometry, TransformError> {
        self.try_map_coords(|p| projection.to_display(p))
    }

    pub fn to_geographic(&self, projection: &WebMercator) -> Result<Geometry, TransformError> {
        self.try_map_coords(|p| projection.to_geographic(p))
    }

    /// Geometry equality within `eps`, treating a ring and its closed form as the same shape.
    pub fn approx_eq(&self, other: &Geometry, eps: f64) -> bool {
        match (self, other) {
            (Geometry::Point(a), Geometry::Point(b)) => a.approx_eq(*b, eps),
            (Geometry::LineString(a), Geometry::LineString(b)) => points_approx_eq(a, b, eps),
            (Geometry::Polygon(a), Geometry::Polygon(b)) => {
                points_approx_eq(open_ring(a), open_ring(b), eps)
            }
            (
                Geometry::Circle {
                    center: ca,
                    radius: ra,
                },
                Geometry::Circle {
                    center: cb,
                    radius: rb,
                },
            ) => ca.approx_eq(*cb, eps) && (ra - rb).abs() <= eps,
            _ => false,
        }
    }
}

/// The ring without its closing vertex, if it has one.
pub fn open_ring(ring: &[Vec2]) -> &[Vec2] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// The ring with the first vertex repeated at the end when it is not already.
///
/// Closure is judged by exact equality of the stored values.
pub fn closed_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let mut closed = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if ring.len() == 1 || first != last {
            closed.push(*first);
        }
    }
    closed
}

fn points_approx_eq(a: &[Vec2], b: &[Vec2], eps: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.approx_eq(*q, eps))
}

fn ensure_finite(points: &[Vec2]) -> Result<(), GeometryError> {
    if points.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

fn ensure_vertices(kind: ShapeKind, min: usize, got: usize) -> Result<(), GeometryError> {
    if got >= min {
        Ok(())
    } else {
        Err(GeometryError::TooFewVertices { kind, min, got })
    }
}
