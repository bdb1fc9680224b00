//! Gateway counters
//!
//! - Monotonic counters, plus the current method count
//! - Reset only on process start
//! - Lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all operational counters
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Invocations received
    invocations: AtomicU64,
    /// Invocations that returned an error
    invocation_failures: AtomicU64,
    /// Shaped rows returned by result-producing calls
    rows_returned: AtomicU64,
    /// Rows affected by no-result calls
    rows_affected: AtomicU64,
    /// Successful catalog loads
    catalog_loads: AtomicU64,
    /// Failed catalog loads
    catalog_load_failures: AtomicU64,
    /// Methods in the current registry snapshot
    methods: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_invocations(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invocation_failures(&self) {
        self.invocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_returned(&self, rows: u64) {
        self.rows_returned.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_rows_affected(&self, rows: u64) {
        self.rows_affected.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_catalog_loads(&self) {
        self.catalog_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_catalog_load_failures(&self) {
        self.catalog_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the method count after a snapshot swap
    pub fn set_methods(&self, count: u64) {
        self.methods.store(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            catalog_loads: self.catalog_loads.load(Ordering::Relaxed),
            catalog_load_failures: self.catalog_load_failures.load(Ordering::Relaxed),
            methods: self.methods.load(Ordering::Relaxed),
        }
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub invocations: u64,
    pub invocation_failures: u64,
    pub rows_returned: u64,
    pub rows_affected: u64,
    pub catalog_loads: u64,
    pub catalog_load_failures: u64,
    pub methods: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.invocations, 0);
        assert_eq!(snapshot.catalog_loads, 0);
        assert_eq!(snapshot.methods, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_invocations();
        registry.increment_invocations();
        registry.increment_invocation_failures();
        registry.add_rows_returned(3);
        registry.add_rows_affected(5);
        registry.increment_catalog_loads();
        registry.increment_catalog_load_failures();
        registry.set_methods(12);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.invocations, 2);
        assert_eq!(snapshot.invocation_failures, 1);
        assert_eq!(snapshot.rows_returned, 3);
        assert_eq!(snapshot.rows_affected, 5);
        assert_eq!(snapshot.catalog_loads, 1);
        assert_eq!(snapshot.catalog_load_failures, 1);
        assert_eq!(snapshot.methods, 12);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_invocations();

        let json = registry.to_json();
        assert_eq!(json["invocations"], 1);
        assert_eq!(json["methods"], 0);
    }
}
