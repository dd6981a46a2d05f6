//! Function registry for the condition evaluator
//!
//! Maps function names to pure implementations over evaluated positional
//! arguments. `history_count` is not registered here: it takes keyword filters
//! and suspends on the history store, so the engine dispatches it itself.

use crate::error::EvalResult;
use crate::operators::functions::{fn_abs, fn_len, fn_max, fn_min};
use octofhir_acmg_types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Type alias for function implementations
pub type FunctionFn = Arc<dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync>;

/// Registered functions by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionFn>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `len`, `min`, `max` and `abs`
    pub fn with_standard_functions() -> Self {
        let mut registry = Self::new();
        registry.register("len", Arc::new(fn_len));
        registry.register("min", Arc::new(fn_min));
        registry.register("max", Arc::new(fn_max));
        registry.register("abs", Arc::new(fn_abs));
        registry
    }

    /// Register (or replace) a function
    pub fn register(&mut self, name: impl Into<String>, implementation: FunctionFn) {
        self.functions.insert(name.into(), implementation);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
