pub mod wkt;

pub use wkt::{ParseError, parse, serialize};
