//! # Gateway
//!
//! Owns the connection resource, the registry, the catalog loader and the
//! invoker, and is what the transports hold on to.

use std::sync::Arc;

use crate::config::DbConfig;
use crate::db::{Database, DbError, PgDatabase, Sleeper, TokioSleeper};
use crate::functions::{
    CatalogLoader, FunctionResult, Invocation, Invoker, Method, MethodRegistry,
};
use crate::observability::{Logger, MetricsRegistry};
use crate::value::Args;

/// Shared gateway state
pub struct Gateway {
    registry: Arc<MethodRegistry>,
    loader: CatalogLoader,
    invoker: Invoker,
    metrics: Arc<MetricsRegistry>,
    namespace: Option<String>,
}

impl Gateway {
    /// Connect to Postgres (waiting per the retry policy) and load the catalog
    ///
    /// A failed first load fails startup.
    pub async fn start(config: &DbConfig) -> FunctionResult<Self> {
        Self::start_with_sleeper(config, &TokioSleeper).await
    }

    pub async fn start_with_sleeper(
        config: &DbConfig,
        sleeper: &dyn Sleeper,
    ) -> FunctionResult<Self> {
        config.validate().map_err(DbError::Config)?;
        Logger::set_debug(config.debug);

        let db = PgDatabase::connect(config, sleeper).await?;
        let gateway = Self::with_database(Arc::new(db), config);
        gateway.reload(None).await?;
        Ok(gateway)
    }

    /// Build a gateway over any connection resource, without loading
    pub fn with_database(db: Arc<dyn Database>, config: &DbConfig) -> Self {
        let registry = Arc::new(MethodRegistry::new());
        let metrics = Arc::new(MetricsRegistry::new());

        let loader = CatalogLoader::new(
            db.clone(),
            registry.clone(),
            config.catalog_config(),
            metrics.clone(),
        );
        let invoker = Invoker::new(
            db,
            registry.clone(),
            config.invoker_config(),
            metrics.clone(),
        );

        Self {
            registry,
            loader,
            invoker,
            metrics,
            namespace: config.namespace.clone(),
        }
    }

    pub async fn invoke(&self, method: &str, args: &Args) -> FunctionResult<Invocation> {
        self.invoker.invoke(method, args).await
    }

    /// Invoke `method` only if it is marked read-only
    pub async fn invoke_read_only(&self, method: &str, args: &Args) -> FunctionResult<Invocation> {
        self.invoker.invoke_read_only(method, args).await
    }

    /// Re-run the catalog loader
    ///
    /// `namespace` overrides the configured namespace filter for this load.
    pub async fn reload(&self, namespace: Option<&str>) -> FunctionResult<usize> {
        let namespace = namespace.or(self.namespace.as_deref());
        self.loader.reload(namespace).await
    }

    pub fn methods(&self) -> Vec<Method> {
        self.registry.list()
    }

    pub fn method(&self, name: &str) -> FunctionResult<Method> {
        self.registry.lookup(name)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.registry.is_read_only(name)
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}
