//! CLI module for dbrpc
//!
//! Provides command-line interface for:
//! - serve: Connect, load the catalog and serve HTTP
//! - methods: Print the method descriptors
//! - call: One-shot invocation with JSON arguments from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Options};
pub use commands::{call, methods, resolve_config, run, run_command, serve};
pub use errors::{CliError, CliResult};
pub use io::{read_request, request_args, write_error, write_response};
