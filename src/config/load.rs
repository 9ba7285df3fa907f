//! Store assembly from overrides and property files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::env::EnvironmentFallback;
use crate::error::AppError;
use crate::store::ConfigurationStore;

use super::{properties, toml_file};

/// Key naming an extra property file to load after the overrides.
pub const APPLICATION_PROPERTIES: &str = "application.properties";

/// Where the initial properties come from.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// Property files loaded in order, later files overwriting earlier ones.
    pub files: Vec<PathBuf>,
    /// `-D key=value` pairs, applied first.
    pub overrides: Vec<(String, String)>,
}

/// Build the store: overrides, then the file named by
/// `application.properties` (store or env), then `sources.files`.
pub fn load<E>(sources: &Sources, env: &E) -> Result<ConfigurationStore, AppError>
where
    E: EnvironmentFallback + ?Sized,
{
    let mut store = ConfigurationStore::new();
    store.extend(sources.overrides.iter().cloned());

    if let Some(path) = store.lookup(APPLICATION_PROPERTIES, env) {
        load_file(&expand_home(&path), &mut store)?;
    }
    for path in &sources.files {
        load_file(path, &mut store)?;
    }

    debug!(keys = store.len(), files = sources.files.len(), "configuration store built");
    Ok(store)
}

/// Load one file into `store`, returning the number of entries read.
/// `.toml` files use the TOML loader; everything else is `.properties`.
pub fn load_file(path: &Path, store: &mut ConfigurationStore) -> Result<usize, AppError> {
    let entries = if is_toml(path) {
        toml_file::load(path)?
    } else {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        properties::parse(&raw)
            .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?
    };

    let count = entries.len();
    store.extend(entries);
    debug!(path = %path.display(), entries = count, "property file loaded");
    Ok(count)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Parse a `key=value` override. A bare `key` maps to an empty value.
pub fn parse_override(arg: &str) -> Result<(String, String), AppError> {
    let (key, value) = arg.split_once('=').unwrap_or((arg, ""));
    if key.is_empty() {
        return Err(AppError::Config(format!("override '{arg}' has an empty key")));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
