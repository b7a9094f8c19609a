//! Remote sync gateway: the CRUD contract the core depends on, its JSON wire
//! format, and the HTTP implementation.

pub mod config;
pub mod gateway;
pub mod http;
pub mod protocol;

pub use config::*;
pub use gateway::*;
pub use http::HttpGateway;
pub use protocol::*;
