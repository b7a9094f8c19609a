use foundation::math::TransformError;
use formats::ParseError;
use remote::GatewayError;
use scene::{GeometryError, IndexError, ShapeKind};
use thiserror::Error;

/// User input rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("coordinates must not be empty")]
    EmptyWkt,
    #[error("expected a {expected} geometry, got a {got}")]
    KindMismatch { expected: ShapeKind, got: ShapeKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("a shape is still being saved")]
    Busy,
}

/// Every failure the core reports. None of them is fatal; the index is left
/// consistent and the operation can be retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
