//! The property store that interpolation runs over.
//!
//! One `ConfigurationStore` is built by the configuration sources, rewritten in
//! place by [`crate::interpolate::resolve`], then read by the settings
//! consumers. Keys are kept sorted so passes and printed output are stable.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::env::EnvironmentFallback;

/// String-to-string property map. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationStore {
    entries: BTreeMap<String, String>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Two-source lookup: this store first, then `env`.
    pub fn lookup<E>(&self, key: &str, env: &E) -> Option<String>
    where
        E: EnvironmentFallback + ?Sized,
    {
        match self.entries.get(key) {
            Some(value) => Some(value.clone()),
            None => env.lookup(key),
        }
    }

    /// [`lookup`](Self::lookup) with a fallback default.
    pub fn get_or<E>(&self, key: &str, env: &E, default: &str) -> String
    where
        E: EnvironmentFallback + ?Sized,
    {
        self.lookup(key, env).unwrap_or_else(|| default.to_string())
    }
}

impl<K, V> Extend<(K, V)> for ConfigurationStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.entries.insert(k.into(), v.into());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigurationStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl IntoIterator for ConfigurationStore {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
