//! # Method Invoker
//!
//! The single entry point the transport calls: resolve the method, bind
//! arguments, run the statement and shape the rows. Nothing here is
//! retried; database failures are returned as they come.

use std::sync::Arc;

use uuid::Uuid;

use super::errors::{FunctionError, FunctionResult};
use super::registry::MethodRegistry;
use super::shape::shape_rows;
use super::sql::{build_call, CallShape};
use crate::db::Database;
use crate::observability::{Logger, MetricsRegistry};
use crate::value::{Args, Value};

/// SQL synthesis options
#[derive(Debug, Clone, PartialEq)]
pub struct InvokerConfig {
    /// Named-argument token, `:=` or `=>`
    pub arg_syntax: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            arg_syntax: ":=".to_string(),
        }
    }
}

/// Per-call context carried through the logs
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub id: Uuid,
    pub method: String,
    /// Refuse methods not marked read-only
    pub read_only: bool,
}

impl InvocationContext {
    pub fn new(method: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.to_string(),
            read_only: false,
        }
    }
}

/// Outcome of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// No-result method: affected-row count, no value payload
    Affected(u64),

    /// Shaped scalar, object or (for set methods) array
    Value(Value),
}

impl Invocation {
    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            Invocation::Affected(n) => Some(*n),
            Invocation::Value(_) => None,
        }
    }

    /// The value payload; `None` for no-result methods
    pub fn value(&self) -> Option<&Value> {
        match self {
            Invocation::Affected(_) => None,
            Invocation::Value(v) => Some(v),
        }
    }

    /// JSON rendering used by the command line
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Invocation::Affected(n) => serde_json::json!({ "rows_affected": n }),
            Invocation::Value(v) => serde_json::Value::from(v.clone()),
        }
    }
}

/// Method invoker
pub struct Invoker {
    db: Arc<dyn Database>,
    registry: Arc<MethodRegistry>,
    config: InvokerConfig,
    metrics: Arc<MetricsRegistry>,
}

impl Invoker {
    pub fn new(
        db: Arc<dyn Database>,
        registry: Arc<MethodRegistry>,
        config: InvokerConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            db,
            registry,
            config,
            metrics,
        }
    }

    /// Invoke `method` with caller arguments
    pub async fn invoke(&self, method: &str, args: &Args) -> FunctionResult<Invocation> {
        self.call(InvocationContext::new(method), args).await
    }

    /// Invoke `method` only if it is marked read-only
    ///
    /// The read-only check and the call see the same registry snapshot.
    pub async fn invoke_read_only(&self, method: &str, args: &Args) -> FunctionResult<Invocation> {
        let context = InvocationContext {
            read_only: true,
            ..InvocationContext::new(method)
        };
        self.call(context, args).await
    }

    async fn call(&self, context: InvocationContext, args: &Args) -> FunctionResult<Invocation> {
        let method = context.method.as_str();
        self.metrics.increment_invocations();

        let result = self.run(&context, args).await;
        if let Err(e) = &result {
            self.metrics.increment_invocation_failures();
            Logger::warn(
                "RPC_CALL_FAILED",
                &[
                    ("call_id", &context.id.to_string()),
                    ("method", method),
                    ("code", e.code()),
                    ("error", &e.to_string()),
                ],
            );
        }
        result
    }

    async fn run(&self, context: &InvocationContext, args: &Args) -> FunctionResult<Invocation> {
        // One snapshot for the whole call, so a concurrent reload cannot
        // change the descriptor halfway through.
        let snapshot = self.registry.snapshot();
        let method = snapshot
            .get(&context.method)
            .ok_or_else(|| FunctionError::MethodNotFound(context.method.clone()))?;
        if context.read_only && !method.is_read_only {
            return Err(FunctionError::NotReadOnly(context.method.clone()));
        }

        let statement = build_call(method, args, &self.config.arg_syntax)?;
        let call_id = context.id.to_string();
        Logger::debug(
            "RPC_SQL",
            &[
                ("call_id", &call_id),
                ("params", &statement.params.len().to_string()),
                ("sql", &statement.sql),
            ],
        );

        match statement.shape {
            CallShape::NoResult => {
                let affected = self.db.execute(&statement.sql, &statement.params).await?;
                self.metrics.add_rows_affected(affected);
                Logger::debug(
                    "RPC_ROWS_AFFECTED",
                    &[("call_id", &call_id), ("rows", &affected.to_string())],
                );
                Ok(Invocation::Affected(affected))
            }
            CallShape::Rows => {
                let rows = self.db.query(&statement.sql, &statement.params).await?;
                self.metrics.add_rows_returned(rows.len() as u64);
                Ok(Invocation::Value(shape_rows(method, rows)?))
            }
        }
    }
}
