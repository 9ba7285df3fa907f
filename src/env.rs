//! Environment fallback, the second lookup source after the store.
//!
//! The binary uses [`ProcessEnv`] (after `dotenvy` has loaded any `.env`
//! file). Tests pass a `HashMap` instead of mutating process env vars.

use std::collections::{BTreeMap, HashMap};

/// Read-only key lookup queried only for keys the store does not hold.
pub trait EnvironmentFallback {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The process environment. Non-UTF-8 values count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentFallback for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        if key.is_empty() || key.contains(['=', '\0']) {
            return None;
        }
        std::env::var(key).ok()
    }
}

/// A fallback that never has a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnv;

impl EnvironmentFallback for NoEnv {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}

impl EnvironmentFallback for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvironmentFallback for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<T: EnvironmentFallback + ?Sized> EnvironmentFallback for &T {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}
