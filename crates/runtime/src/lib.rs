//! Orchestration of the draw-to-persist flow and of load/update/delete
//! against the remote store, keeping the local feature index consistent.

pub mod config;
pub mod controller;
pub mod draw;
pub mod error;
pub mod event_bus;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use controller::*;
pub use draw::*;
pub use error::*;
pub use event_bus::*;
pub use prompt::*;
