//! # Method Registry
//!
//! Holds the current catalog snapshot. A snapshot is built off to the side
//! by the catalog loader and swapped in whole; readers clone the pointer
//! and never observe a partially-built map.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::errors::{FunctionError, FunctionResult};
use super::method::Method;

/// An immutable set of method descriptors, keyed by method name
pub type Snapshot = HashMap<String, Method>;

/// Registry of callable methods
#[derive(Debug, Default)]
pub struct MethodRegistry {
    /// `None` until the first successful load
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl MethodRegistry {
    /// Create an empty, unloaded registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry already holding `methods`
    pub fn with_methods(methods: impl IntoIterator<Item = Method>) -> Self {
        let registry = Self::new();
        registry.replace(methods.into_iter().map(|m| (m.name.clone(), m)).collect());
        registry
    }

    /// Current snapshot (empty if nothing was loaded yet)
    ///
    /// The lock is held only to clone the pointer.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // The guarded value is a pointer that is only ever swapped whole.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone().unwrap_or_default()
    }

    /// Swap in a new snapshot, returning the previous one
    pub fn replace(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(next)
    }

    /// Whether any load has succeeded
    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Get method by name
    pub fn lookup(&self, name: &str) -> FunctionResult<Method> {
        self.snapshot()
            .get(name)
            .cloned()
            .ok_or_else(|| FunctionError::MethodNotFound(name.to_string()))
    }

    /// True only if the method exists and is read-only
    pub fn is_read_only(&self, name: &str) -> bool {
        self.snapshot()
            .get(name)
            .map(|m| m.is_read_only)
            .unwrap_or(false)
    }

    /// List all methods, sorted by name
    pub fn list(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.snapshot().values().cloned().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    /// Get method count
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
