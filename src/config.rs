//! Gateway Configuration
//!
//! Flags are parsed with clap; the same structure loads from a JSON file
//! (`--config`), where missing keys take the flag defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::db::RetryPolicy;
use crate::functions::{CatalogConfig, InvokerConfig};
use crate::http_server::HttpServerConfig;

/// Database and catalog options
#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Database connection URI
    #[arg(long, env = "DBRPC_DSN", default_value = "postgres://localhost/postgres")]
    pub dsn: String,

    /// Database functions schema name or comma delimited list
    #[arg(long = "db_schema", default_value = "")]
    pub schema: String,

    /// Debug DB operations
    #[arg(long = "db_debug")]
    pub debug: bool,

    /// Argument definition function
    #[arg(long = "db_indef", default_value = "func_args")]
    pub in_def_func: String,

    /// Result row definition function
    #[arg(long = "db_outdef", default_value = "func_result")]
    pub out_def_func: String,

    /// Available functions list
    #[arg(long = "db_index", default_value = "index")]
    pub index_func: String,

    /// Default named args syntax (:= or =>)
    #[arg(long = "db_arg_syntax", default_value = ":=")]
    pub arg_syntax: String,

    /// Trim prefix from arg name
    #[arg(long = "db_arg_prefix", default_value = "a_")]
    pub arg_trim_prefix: String,

    /// Only load methods of this namespace
    #[arg(long = "db_namespace")]
    pub namespace: Option<String>,

    /// Maximum pooled connections
    #[arg(long = "db_pool_size", default_value_t = 2)]
    pub pool_size: usize,

    /// Delay between startup connect attempts
    #[arg(long = "db_retry_delay_ms", default_value_t = 5000)]
    pub retry_delay_ms: u64,

    /// Delay multiplier per failed attempt (1.0 = fixed delay)
    #[arg(long = "db_retry_backoff", default_value_t = 1.0)]
    pub retry_backoff: f64,

    /// Upper bound for the startup retry delay
    #[arg(long = "db_retry_max_delay_ms", default_value_t = 60_000)]
    pub retry_max_delay_ms: u64,

    /// Give up after this many connect attempts (default: never)
    #[arg(long = "db_retry_max_attempts")]
    pub retry_max_attempts: Option<u32>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dsn: "postgres://localhost/postgres".to_string(),
            schema: String::new(),
            debug: false,
            in_def_func: "func_args".to_string(),
            out_def_func: "func_result".to_string(),
            index_func: "index".to_string(),
            arg_syntax: ":=".to_string(),
            arg_trim_prefix: "a_".to_string(),
            namespace: None,
            pool_size: 2,
            retry_delay_ms: 5000,
            retry_backoff: 1.0,
            retry_max_delay_ms: 60_000,
            retry_max_attempts: None,
        }
    }
}

impl DbConfig {
    /// Validate option values
    pub fn validate(&self) -> Result<(), String> {
        if self.arg_syntax != ":=" && self.arg_syntax != "=>" {
            return Err(format!(
                "Invalid db_arg_syntax: '{}'. Must be ':=' or '=>'.",
                self.arg_syntax
            ));
        }
        if self.pool_size == 0 {
            return Err("db_pool_size must be > 0".to_string());
        }
        for (name, value) in [
            ("db_index", &self.index_func),
            ("db_indef", &self.in_def_func),
            ("db_outdef", &self.out_def_func),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        if !(self.retry_backoff >= 1.0) {
            return Err("db_retry_backoff must be >= 1.0".to_string());
        }
        Ok(())
    }

    /// Startup connection retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.retry_delay_ms),
            backoff: self.retry_backoff,
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            max_attempts: self.retry_max_attempts,
        }
    }

    /// Descriptor function names for the catalog loader
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            index_func: self.index_func.clone(),
            in_def_func: self.in_def_func.clone(),
            out_def_func: self.out_def_func.clone(),
            arg_trim_prefix: self.arg_trim_prefix.clone(),
        }
    }

    /// SQL synthesis options for the invoker
    pub fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            arg_syntax: self.arg_syntax.clone(),
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[command(flatten)]
    pub db: DbConfig,

    #[command(flatten)]
    pub http: HttpServerConfig,
}

impl GatewayConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

        let config: GatewayConfig =
            serde_json::from_str(&content).map_err(|e| format!("Invalid config JSON: {}", e))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.db.validate()
    }
}
