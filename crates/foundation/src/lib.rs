pub mod math;

// Planar primitives and the display projection.
pub use math::*;
