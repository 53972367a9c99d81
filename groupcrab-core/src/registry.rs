//! Registry of user-defined aggregate functions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::function::{AggregateFunction, CombineFn, erase};

/// User-defined aggregates, looked up by exact name when a call does not
/// match a built-in.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn AggregateFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed aggregate under `name`, replacing any previous entry.
    pub fn register<F: CombineFn>(&mut self, name: impl Into<String>, function: F) {
        self.register_dyn(name, erase(function));
    }

    /// Register an already type-erased aggregate.
    pub fn register_dyn(&mut self, name: impl Into<String>, function: Arc<dyn AggregateFunction>) {
        let name = name.into();
        tracing::debug!(function = %name, "registered user-defined aggregate");
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AggregateFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
