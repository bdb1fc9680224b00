//! Postgres connection resource
//!
//! A bounded `deadpool-postgres` pool. Every new pooled connection runs
//! the search-path hook; a failing hook fails that connection attempt.

use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::{
    Hook, HookError, Manager, ManagerConfig, Object, Pool, PoolError, RecyclingMethod,
};
use futures_util::{pin_mut, TryStreamExt};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use super::errors::{DbError, DbResult};
use super::pg_types::decode_row;
use super::retry::{retry, Sleeper};
use super::{Database, Row};
use crate::config::DbConfig;
use crate::observability::Logger;
use crate::value::Value;

/// Pooled Postgres handle
pub struct PgDatabase {
    pool: Pool,
}

impl std::fmt::Debug for PgDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgDatabase")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .finish()
    }
}

fn pool_error(e: PoolError) -> DbError {
    match e {
        PoolError::Backend(e) => DbError::Connect(DbError::describe(&e)),
        PoolError::PostCreateHook(HookError::Backend(e)) => {
            DbError::Connect(format!("after-connect hook: {}", DbError::describe(&e)))
        }
        PoolError::PostCreateHook(HookError::Message(m)) => {
            DbError::Connect(format!("after-connect hook: {}", m))
        }
        other => DbError::Pool(other.to_string()),
    }
}

/// Statement run on every new connection when a schema is configured
pub fn search_path_statement(schema: &str) -> Option<String> {
    if schema.trim().is_empty() {
        None
    } else {
        Some(format!("set search_path = {}", schema))
    }
}

impl PgDatabase {
    /// Build the pool without connecting
    ///
    /// Connections are opened lazily; use [`PgDatabase::connect`] to block
    /// until the database is reachable.
    pub fn from_config(config: &DbConfig) -> DbResult<Self> {
        let pg_config = tokio_postgres::Config::from_str(&config.dsn)
            .map_err(|e| DbError::Config(format!("invalid DSN: {}", e)))?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let search_path = search_path_statement(&config.schema);
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .post_create(Hook::async_fn(move |client, _| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    if let Some(stmt) = search_path {
                        Logger::debug("DB_SEARCH_PATH", &[("statement", &stmt)]);
                        client.batch_execute(&stmt).await.map_err(HookError::Backend)?;
                    }
                    Logger::debug("DB_CONNECTION_ADDED", &[]);
                    Ok(())
                })
            }))
            .build()
            .map_err(|e| DbError::Config(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Build the pool and wait until one connection succeeds
    ///
    /// Blocks according to the configured retry policy; with no attempt
    /// bound this only returns once the database is reachable.
    pub async fn connect(config: &DbConfig, sleeper: &dyn Sleeper) -> DbResult<Self> {
        let db = Self::from_config(config)?;
        let policy = config.retry_policy();

        retry(&policy, sleeper, |attempt| {
            let db = &db;
            async move {
                let attempt_str = attempt.to_string();
                Logger::debug("DB_CONNECT_ATTEMPT", &[("attempt", &attempt_str)]);
                db.probe().await
            }
        })
        .await?;

        let pool_size = config.pool_size.to_string();
        Logger::info("DB_CONNECTED", &[("pool_size", &pool_size)]);
        Ok(db)
    }

    /// Check out one connection and return it to the pool
    pub async fn probe(&self) -> DbResult<()> {
        self.client().await.map(|_| ())
    }

    async fn client(&self) -> DbResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        let client = self.client().await?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(client.execute(sql, &refs).await?)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let client = self.client().await?;
        let stream = client.query_raw(sql, params.iter()).await?;
        pin_mut!(stream);

        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_statement() {
        assert_eq!(search_path_statement(""), None);
        assert_eq!(search_path_statement("  "), None);
        assert_eq!(
            search_path_statement("rpc,public").as_deref(),
            Some("set search_path = rpc,public")
        );
    }

    #[test]
    fn test_invalid_dsn_is_config_error() {
        let config = DbConfig {
            dsn: "postgres://host:notaport/db".into(),
            ..Default::default()
        };
        assert!(matches!(PgDatabase::from_config(&config), Err(DbError::Config(_))));
    }

    #[tokio::test]
    async fn test_pool_is_built_lazily() {
        let config = DbConfig {
            dsn: "postgres://rpc@127.0.0.1:1/rpc".into(),
            pool_size: 3,
            ..Default::default()
        };
        let db = PgDatabase::from_config(&config).unwrap();
        assert_eq!(db.pool.status().max_size, 3);
        assert_eq!(db.pool.status().size, 0);
    }

    #[test]
    fn test_failing_search_path_hook_is_connect_error() {
        let backend = "port=notaport".parse::<tokio_postgres::Config>().unwrap_err();
        let err = pool_error(PoolError::PostCreateHook(HookError::Backend(backend)));
        assert!(matches!(err, DbError::Connect(ref m) if m.starts_with("after-connect hook: ")));
        assert_eq!(err.status_code(), 503);

        let err = pool_error(PoolError::PostCreateHook(HookError::message("no schema")));
        assert!(matches!(err, DbError::Connect(ref m) if m == "after-connect hook: no schema"));
    }

    #[test]
    fn test_closed_pool_is_pool_error() {
        assert!(matches!(pool_error(PoolError::Closed), DbError::Pool(_)));
    }

    #[tokio::test]
    async fn test_connect_fails_after_bounded_attempts() {
        use crate::db::retry::Sleeper;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::time::Duration;

        #[derive(Default)]
        struct CountingSleeper(AtomicU32);

        #[async_trait]
        impl Sleeper for CountingSleeper {
            async fn sleep(&self, _duration: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let config = DbConfig {
            dsn: "postgres://rpc@127.0.0.1:1/rpc".into(),
            schema: "rpc".into(),
            retry_max_attempts: Some(2),
            ..Default::default()
        };
        let sleeper = CountingSleeper::default();
        let err = PgDatabase::connect(&config, &sleeper).await.unwrap_err();
        assert!(matches!(err, DbError::Connect(_)));
        assert_eq!(sleeper.0.load(Ordering::SeqCst), 1);
    }
}
