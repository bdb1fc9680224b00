//! HTTP Server Configuration
//!
//! Listener address and CORS settings for the RPC transport.

use clap::Args;
use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Args, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (empty: any origin)
    #[arg(long = "cors-origin")]
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
