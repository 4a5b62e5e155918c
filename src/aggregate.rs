//! Aggregate-function registry boundary.
//!
//! Inside a `summarize` region, a call like `(summary "status")` is only
//! an aggregate-function reference if the surrounding process knows a
//! function by that name. The registry answering that question is an
//! external collaborator; the builder consults it through this trait and
//! never interprets unknown names on its own.

use std::collections::HashSet;

/// Answers whether a function identifier names a known aggregate function.
pub trait AggregateRegistry: Send + Sync {
    fn is_function(&self, name: &str) -> bool;
}

/// Registry backed by a fixed name set.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    functions: HashSet<String>,
}

impl StaticRegistry {
    pub fn new(functions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }

    /// The stock aggregate plugins shipped with the RPC framework.
    pub fn stock() -> Self {
        Self::new(["average", "summary", "sum", "boolean_summary"])
    }
}

impl AggregateRegistry for StaticRegistry {
    fn is_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_registry() {
        let registry = StaticRegistry::stock();
        assert!(registry.is_function("summary"));
        assert!(registry.is_function("average"));
        assert!(!registry.is_function("sumary"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = StaticRegistry::default();
        assert!(!registry.is_function("summary"));
    }
}
