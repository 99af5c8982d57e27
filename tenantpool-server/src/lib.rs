//! tenantpool-server: management HTTP surface for the pool registry
//!
//! Lists live pools and exposes `clear_all` so operators can force every
//! pool to reconnect, e.g. after rotating database credentials.

pub mod http;

pub use http::{build_router, run_server, ApiError, ServerConfig, ServerError};
