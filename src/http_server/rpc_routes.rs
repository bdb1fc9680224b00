//! RPC HTTP Routes
//!
//! - `POST /rpc`: JSON-RPC 2.0 envelope, `params` as an object, a
//!   one-element array holding an object, or absent
//! - `GET /rpc/:method?k=v`: read-only methods only, values bound as text
//!
//! No-result methods answer `null` with the affected-row count in the
//! `x-rows-affected` header.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::errors::HttpResult;
use crate::functions::{rpc_codes, Invocation};
use crate::gateway::Gateway;
use crate::value::{Args, Value};

pub const ROWS_AFFECTED_HEADER: &str = "x-rows-affected";

// ==================
// Envelope Types
// ==================

/// A decoded JSON-RPC call
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub id: JsonValue,
    pub method: String,
    pub args: Args,
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcOutcome {
    Result(JsonValue),
    Error(RpcErrorObject),
}

/// JSON-RPC response envelope
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: JsonValue,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

impl RpcResponse {
    pub fn result(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: RpcOutcome::Result(result),
        }
    }

    pub fn error(id: JsonValue, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: RpcOutcome::Error(RpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

impl RpcCall {
    /// Decode a request envelope
    ///
    /// On failure returns the error response to send, carrying the request
    /// id when one could be read.
    pub fn parse(request: JsonValue) -> Result<Self, RpcResponse> {
        let JsonValue::Object(mut envelope) = request else {
            return Err(RpcResponse::error(
                JsonValue::Null,
                rpc_codes::INVALID_REQUEST,
                "Invalid Request",
            ));
        };

        let id = envelope.remove("id").unwrap_or(JsonValue::Null);

        if envelope.get("jsonrpc").and_then(JsonValue::as_str) != Some("2.0") {
            return Err(RpcResponse::error(
                id,
                rpc_codes::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        let method = match envelope.remove("method") {
            Some(JsonValue::String(method)) if !method.is_empty() => method,
            _ => {
                return Err(RpcResponse::error(
                    id,
                    rpc_codes::INVALID_REQUEST,
                    "Invalid Request: method must be a non-empty string",
                ))
            }
        };

        let args = match envelope.remove("params") {
            None | Some(JsonValue::Null) => Args::new(),
            Some(JsonValue::Object(map)) => object_args(map),
            Some(JsonValue::Array(mut items)) if items.len() <= 1 => match items.pop() {
                None => Args::new(),
                Some(JsonValue::Object(map)) => object_args(map),
                Some(_) => return Err(invalid_params(id)),
            },
            Some(_) => return Err(invalid_params(id)),
        };

        Ok(Self { id, method, args })
    }
}

fn object_args(map: serde_json::Map<String, JsonValue>) -> Args {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

fn invalid_params(id: JsonValue) -> RpcResponse {
    RpcResponse::error(
        id,
        rpc_codes::INVALID_PARAMS,
        "Invalid params: expected an object of named arguments",
    )
}

// ==================
// RPC Routes
// ==================

/// Create RPC routes
pub fn rpc_routes(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/rpc/:method", get(rpc_get_handler))
        .with_state(gateway)
}

fn with_rows_affected(mut response: Response, invocation: &Invocation) -> Response {
    if let Some(rows) = invocation.rows_affected() {
        response.headers_mut().insert(
            HeaderName::from_static(ROWS_AFFECTED_HEADER),
            HeaderValue::from(rows),
        );
    }
    response
}

fn result_json(invocation: &Invocation) -> JsonValue {
    invocation
        .value()
        .cloned()
        .map(JsonValue::from)
        .unwrap_or(JsonValue::Null)
}

async fn rpc_handler(State(gateway): State<Arc<Gateway>>, body: Bytes) -> Response {
    let request: JsonValue = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let response = RpcResponse::error(
                JsonValue::Null,
                rpc_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            );
            return Json(response).into_response();
        }
    };

    let call = match RpcCall::parse(request) {
        Ok(call) => call,
        Err(response) => return Json(response).into_response(),
    };

    match gateway.invoke(&call.method, &call.args).await {
        Ok(invocation) => {
            let response = RpcResponse::result(call.id, result_json(&invocation));
            with_rows_affected(Json(response).into_response(), &invocation)
        }
        Err(e) => Json(RpcResponse::error(call.id, e.rpc_code(), e.to_string())).into_response(),
    }
}

async fn rpc_get_handler(
    State(gateway): State<Arc<Gateway>>,
    Path(method): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> HttpResult<Response> {
    let args: Args = query
        .into_iter()
        .map(|(k, v)| (k, Value::Text(v)))
        .collect();

    let invocation = gateway.invoke_read_only(&method, &args).await?;
    let response = Json(result_json(&invocation)).into_response();
    Ok(with_rows_affected(response, &invocation))
}
