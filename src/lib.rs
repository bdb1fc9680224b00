//! dbrpc - expose database stored functions as named RPC methods
//!
//! A catalog of stored functions is read from three descriptor functions
//! into a method registry; each call is validated against its descriptor,
//! turned into a parameterized `SELECT`, run on a pooled connection and
//! shaped into a scalar, object or array result.

pub mod cli;
pub mod config;
pub mod db;
pub mod functions;
pub mod gateway;
pub mod http_server;
pub mod observability;
pub mod value;
