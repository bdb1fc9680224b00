//! Catalog HTTP Routes
//!
//! Method listing and catalog reload.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::{HttpError, HttpResult};
use crate::functions::Method;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct MethodsListResponse {
    pub methods: Vec<Method>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReloadRequest {
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub methods: usize,
}

/// Create catalog routes
pub fn catalog_routes(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/methods", get(list_methods_handler))
        .route("/methods/:name", get(get_method_handler))
        .route("/reload", post(reload_handler))
        .with_state(gateway)
}

async fn list_methods_handler(State(gateway): State<Arc<Gateway>>) -> Json<MethodsListResponse> {
    let methods = gateway.methods();
    Json(MethodsListResponse {
        total: methods.len(),
        methods,
    })
}

async fn get_method_handler(
    State(gateway): State<Arc<Gateway>>,
    Path(name): Path<String>,
) -> HttpResult<Json<Method>> {
    Ok(Json(gateway.method(&name)?))
}

/// Reload the catalog; the body is optional
async fn reload_handler(
    State(gateway): State<Arc<Gateway>>,
    body: Bytes,
) -> HttpResult<Json<ReloadResponse>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ReloadRequest::default()
    } else {
        serde_json::from_slice::<ReloadRequest>(&body)
            .map_err(|e| HttpError::InvalidBody(e.to_string()))?
    };

    let methods = gateway.reload(request.namespace.as_deref()).await?;
    Ok(Json(ReloadResponse { methods }))
}
