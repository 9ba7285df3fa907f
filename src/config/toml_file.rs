//! TOML property files.
//!
//! Tables flatten into dotted keys, so
//!
//! ```toml
//! [restx.bind]
//! port = 8080
//! ```
//!
//! becomes `restx.bind.port=8080`. A `[meta] base = "..."` entry names a
//! file to load first; the current file is deep-merged over it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Deep-merge two TOML values.
/// Tables are merged recursively; the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a TOML file, follow any `[meta] base = "..."` chain, and return the
/// merged value. `visited` carries canonicalized paths already seen in this
/// chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load `path` (and its base chain) as flattened `(key, value)` pairs.
pub fn load(path: &Path) -> Result<Vec<(String, String)>, AppError> {
    let merged = load_raw_merged(path, &mut HashSet::new())?;
    let mut entries = Vec::new();
    if let toml::Value::Table(table) = merged {
        for (key, value) in table {
            if key == "meta" {
                continue;
            }
            flatten(key, value, &mut entries)
                .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        }
    }
    Ok(entries)
}

fn flatten(key: String, value: toml::Value, out: &mut Vec<(String, String)>) -> Result<(), String> {
    match value {
        toml::Value::Table(table) => {
            for (child, value) in table {
                flatten(format!("{key}.{child}"), value, out)?;
            }
        }
        toml::Value::Array(items) => {
            let parts = items
                .iter()
                .map(scalar_text)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| format!("'{key}' holds an array of tables or arrays"))?;
            out.push((key, parts.join(",")));
        }
        other => {
            if let Some(text) = scalar_text(&other) {
                out.push((key, text));
            }
        }
    }
    Ok(())
}

fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}
