use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use veil_core::{Category, Pattern, Result};

use crate::catalog;

/// Thread-safe, name-keyed pattern store.
///
/// Patterns are enumerated in name order, so callers that stable-sort by
/// priority get a deterministic tie-break.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    patterns: Mutex<BTreeMap<String, Arc<Pattern>>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in catalog
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        for pattern in catalog::builtin_patterns()? {
            registry.add(pattern);
        }
        Ok(registry)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Pattern>>> {
        self.patterns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the pattern with the same name
    pub fn add(&self, pattern: Pattern) {
        let name = pattern.name().to_string();
        if self.lock().insert(name.clone(), Arc::new(pattern)).is_some() {
            tracing::debug!(pattern = %name, "Replaced registered pattern");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Pattern>> {
        self.lock().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    /// Snapshot of enabled patterns, optionally restricted to one category
    pub fn get_patterns(&self, category: Option<Category>) -> Vec<Arc<Pattern>> {
        self.lock()
            .values()
            .filter(|p| p.is_enabled())
            .filter(|p| category.is_none_or(|c| p.category() == c))
            .cloned()
            .collect()
    }

    /// Names of every registered pattern, enabled or not
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
