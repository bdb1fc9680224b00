//! # HTTP Transport
//!
//! Thin JSON-RPC 2.0 front end over the gateway.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `POST /rpc`, `GET /rpc/:method` - Method invocation
//! - `/catalog/*` - Method listing and reload
//! - `/observability/*` - Metrics

pub mod catalog_routes;
pub mod config;
pub mod errors;
pub mod observability_routes;
pub mod rpc_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{HttpError, HttpResult};
pub use rpc_routes::ROWS_AFFECTED_HEADER;
pub use server::HttpServer;
