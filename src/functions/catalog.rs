//! # Catalog Loader
//!
//! Builds a registry snapshot from the three descriptor functions:
//!
//! - index: `(namespace)` -> one row per method
//! - input descriptors: `(method)` -> one row per argument
//! - output descriptors: `(method)` -> one row per output column, in column order
//!
//! The snapshot is assembled off to the side and swapped in only after
//! every descriptor query succeeded. Reloads are serialized, so the
//! published snapshot is always the one from the most recently started load.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::errors::{FunctionError, FunctionResult};
use super::method::{InputArg, Method, OutputArg};
use super::registry::{MethodRegistry, Snapshot};
use crate::db::{Database, Row};
use crate::observability::{MetricsRegistry, ObservationScope};
use crate::value::Value;

/// Descriptor function names and argument key handling
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub index_func: String,
    pub in_def_func: String,
    pub out_def_func: String,
    /// Trimmed from database argument names to form caller keys
    pub arg_trim_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            index_func: "index".to_string(),
            in_def_func: "func_args".to_string(),
            out_def_func: "func_result".to_string(),
            arg_trim_prefix: "a_".to_string(),
        }
    }
}

impl CatalogConfig {
    fn index_sql(&self) -> String {
        format!(
            "SELECT code, nspname, proname, anno, sample, result, is_ro, is_set, is_struct FROM {}($1)",
            self.index_func
        )
    }

    fn inputs_sql(&self) -> String {
        format!(
            "SELECT arg, type, required, def_val, anno FROM {}($1)",
            self.in_def_func
        )
    }

    fn outputs_sql(&self) -> String {
        format!("SELECT arg, type, anno FROM {}($1)", self.out_def_func)
    }
}

/// Positional reader over one descriptor row
struct RowReader<'a> {
    query: &'static str,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    fn new(query: &'static str, row: &'a Row) -> Self {
        Self { query, row }
    }

    fn column(&self, index: usize) -> FunctionResult<&'a Value> {
        self.row.get(index).ok_or_else(|| {
            FunctionError::CatalogLoad(format!(
                "{} row has {} columns, expected column {}",
                self.query,
                self.row.len(),
                index + 1
            ))
        })
    }

    fn text(&self, index: usize) -> FunctionResult<String> {
        match self.optional_text(index)? {
            Some(text) => Ok(text),
            None => Err(FunctionError::CatalogLoad(format!(
                "{} column {} is null",
                self.query,
                index + 1
            ))),
        }
    }

    fn optional_text(&self, index: usize) -> FunctionResult<Option<String>> {
        match self.column(index)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(self.mismatch(index, "text", other)),
        }
    }

    fn flag(&self, index: usize) -> FunctionResult<bool> {
        match self.column(index)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            other => Err(self.mismatch(index, "bool", other)),
        }
    }

    fn mismatch(&self, index: usize, expected: &str, got: &Value) -> FunctionError {
        FunctionError::CatalogLoad(format!(
            "{} column {}: expected {}, got {}",
            self.query,
            index + 1,
            expected,
            got.kind()
        ))
    }
}

/// Loads descriptors and publishes them to a registry
pub struct CatalogLoader {
    db: Arc<dyn Database>,
    registry: Arc<MethodRegistry>,
    config: CatalogConfig,
    metrics: Arc<MetricsRegistry>,
    /// Held for the whole load-and-replace of a reload
    reload_lock: Mutex<()>,
}

impl CatalogLoader {
    pub fn new(
        db: Arc<dyn Database>,
        registry: Arc<MethodRegistry>,
        config: CatalogConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            db,
            registry,
            config,
            metrics,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Build a fresh snapshot without touching the registry
    ///
    /// `namespace` filters the index function; `None` asks for all methods.
    pub async fn load(&self, namespace: Option<&str>) -> FunctionResult<Snapshot> {
        let rows = self
            .fetch(&self.config.index_sql(), Value::from(namespace))
            .await?;

        let mut snapshot = Snapshot::with_capacity(rows.len());
        for row in &rows {
            let method = self.load_method(row).await?;
            snapshot.insert(method.name.clone(), method);
        }
        Ok(snapshot)
    }

    /// Load and atomically publish a new snapshot
    ///
    /// Any failure leaves the current snapshot (or the unloaded state) in
    /// place. Returns the number of methods published.
    pub async fn reload(&self, namespace: Option<&str>) -> FunctionResult<usize> {
        let _writer = self.reload_lock.lock().await;
        let scope = ObservationScope::with_fields(
            "CATALOG_LOAD",
            &[("namespace", namespace.unwrap_or("*"))],
        );

        match self.load(namespace).await {
            Ok(snapshot) => {
                let count = snapshot.len();
                self.registry.replace(snapshot);
                self.metrics.increment_catalog_loads();
                self.metrics.set_methods(count as u64);
                scope.complete_with_fields(&[("methods", &count.to_string())]);
                Ok(count)
            }
            Err(e) => {
                self.metrics.increment_catalog_load_failures();
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn load_method(&self, row: &Row) -> FunctionResult<Method> {
        let r = RowReader::new("index", row);
        let mut method = Method::new(&r.text(0)?, &r.text(1)?, &r.text(2)?);
        method.annotation = r.optional_text(3)?.unwrap_or_default();
        method.sample = r.optional_text(4)?;
        method.result_type = r.optional_text(5)?;
        method.is_read_only = r.flag(6)?;
        method.is_set = r.flag(7)?;
        method.is_struct = r.flag(8)?;

        let code = Value::from(method.name.as_str());

        for row in self.fetch(&self.config.inputs_sql(), code.clone()).await? {
            let r = RowReader::new("input descriptor", &row);
            let mut arg = InputArg::new(
                &r.text(0)?,
                &r.text(1)?,
                r.flag(2)?,
                &self.config.arg_trim_prefix,
            );
            arg.default = r.optional_text(3)?;
            arg.annotation = r.optional_text(4)?;
            method.inputs.insert(arg.name.clone(), arg);
        }

        if method.is_struct {
            for row in self.fetch(&self.config.outputs_sql(), code).await? {
                let r = RowReader::new("output descriptor", &row);
                let mut arg = OutputArg::new(&r.text(0)?, &r.text(1)?);
                arg.annotation = r.optional_text(2)?;
                method.outputs.push(arg);
            }
        }

        Ok(method)
    }

    async fn fetch(&self, sql: &str, param: Value) -> FunctionResult<Vec<Row>> {
        self.db
            .query(sql, &[param])
            .await
            .map_err(|e| FunctionError::CatalogLoad(e.to_string()))
    }
}
