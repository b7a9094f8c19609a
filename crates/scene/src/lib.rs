pub mod entity;
pub mod geometry;
pub mod index;

pub use entity::*;
pub use geometry::*;
pub use index::*;
