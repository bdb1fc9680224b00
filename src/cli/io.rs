//! JSON I/O handling for the CLI
//!
//! - Input: single JSON object via stdin
//! - Output: single JSON object via stdout

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::value::Args;

/// Read one JSON value from stdin
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

/// Parse a request body; blank input is an error
pub fn parse_request(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::Io("Empty input".to_string()));
    }
    Ok(serde_json::from_str(input)?)
}

/// Interpret a request as named call arguments
pub fn request_args(request: Value) -> CliResult<Args> {
    match request {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        other => Err(CliError::Io(format!(
            "Arguments must be a JSON object, got {}",
            other
        ))),
    }
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&serde_json::json!({
        "status": "ok",
        "data": data
    }))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    }))
}
