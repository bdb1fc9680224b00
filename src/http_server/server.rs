//! # HTTP Server
//!
//! Combines the RPC, catalog and observability routers over one gateway.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::catalog_routes::catalog_routes;
use super::config::HttpServerConfig;
use super::observability_routes::{health_routes, observability_routes};
use super::rpc_routes::rpc_routes;
use crate::gateway::Gateway;
use crate::observability::Logger;

/// HTTP front end of the gateway
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self::with_config(gateway, HttpServerConfig::default())
    }

    pub fn with_config(gateway: Arc<Gateway>, config: HttpServerConfig) -> Self {
        let router = Self::build_router(gateway, &config);
        Self { config, router }
    }

    fn build_router(gateway: Arc<Gateway>, config: &HttpServerConfig) -> Router {
        // No configured origins means permissive CORS
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let metrics = gateway.metrics().clone();

        Router::new()
            .merge(health_routes())
            .merge(rpc_routes(gateway.clone()))
            .nest("/catalog", catalog_routes(gateway))
            .nest("/observability", observability_routes(metrics))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Open the listener; host names are resolved, not parsed as addresses
    async fn bind(&self) -> Result<TcpListener, std::io::Error> {
        TcpListener::bind((self.config.host.as_str(), self.config.port)).await
    }

    /// Serve until the listener fails
    pub async fn start(self) -> Result<(), std::io::Error> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?.to_string();
        Logger::info("HTTP_SERVER_START", &[("addr", &addr)]);
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
