//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Gateway counters
//! - Begin/complete scopes for long operations
//!
//! Observability is read-only: nothing here changes the outcome of a call.
//!
//! ```ignore
//! use dbrpc::observability::{Logger, MetricsRegistry, ObservationScope};
//!
//! Logger::info("DB_CONNECTED", &[("pool_size", "2")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_invocations();
//!
//! let scope = ObservationScope::new("CATALOG_LOAD");
//! scope.complete();
//! ```

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};
