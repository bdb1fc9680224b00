//! CLI command implementations
//!
//! Every command resolves the configuration, then starts the gateway:
//! connect (waiting per the retry policy) and load the catalog. A failed
//! first load ends the command.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::http_server::HttpServer;
use crate::observability::Logger;

use super::args::{Command, Options};
use super::errors::{CliError, CliResult};
use super::io::{read_request, request_args, write_error, write_response};

/// Parse the command line and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { options } => serve(&resolve_config(options)?),
        Command::Methods { options } => methods(&resolve_config(options)?),
        Command::Call { method, options } => call(&resolve_config(options)?, &method),
    }
}

/// The config file when one is given, otherwise the flags
pub fn resolve_config(options: Options) -> CliResult<GatewayConfig> {
    let config = match options.config {
        Some(path) => GatewayConfig::load(&path).map_err(CliError::Config)?,
        None => options.gateway,
    };
    config.validate().map_err(CliError::Config)?;
    Ok(config)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Startup(format!("Failed to create tokio runtime: {}", e)))
}

/// Serve JSON-RPC over HTTP until the listener fails
pub fn serve(config: &GatewayConfig) -> CliResult<()> {
    let result = runtime()?.block_on(async {
        let gateway = Arc::new(Gateway::start(&config.db).await?);
        HttpServer::with_config(gateway, config.http.clone())
            .start()
            .await
            .map_err(|e| CliError::Server(format!("HTTP server failed: {}", e)))
    });

    if let Err(e) = &result {
        Logger::fatal("SERVE_FAILED", &[("code", e.code()), ("error", e.message())]);
    }
    result
}

/// Print the loaded method descriptors, sorted by name
pub fn methods(config: &GatewayConfig) -> CliResult<()> {
    let methods = runtime()?.block_on(async {
        let gateway = Gateway::start(&config.db).await?;
        Ok::<_, CliError>(gateway.methods())
    })?;

    write_response(serde_json::json!({
        "total": methods.len(),
        "methods": serde_json::to_value(&methods)?,
    }))
}

/// Invoke one method with arguments from stdin
///
/// Invocation errors are reported on stdout as an error response; only
/// startup and I/O failures end the command with an error.
pub fn call(config: &GatewayConfig, method: &str) -> CliResult<()> {
    let args = request_args(read_request()?)?;

    let result = runtime()?.block_on(async {
        let gateway = Gateway::start(&config.db).await?;
        Ok::<_, CliError>(gateway.invoke(method, &args).await)
    })?;

    match result {
        Ok(invocation) => write_response(invocation.to_json()),
        Err(e) => write_error(e.code(), &e.to_string()),
    }
}
