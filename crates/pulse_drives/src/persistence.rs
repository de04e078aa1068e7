//! Generic per-module JSON checkpoint helpers. Every state module
//! serializes to a single pretty-printed JSON file under the state
//! directory (spec.md §6); loading a missing or corrupt file falls back to
//! the type's `Default` rather than failing the tick (§7's "I/O transient"
//! policy: degrade and continue).

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

pub fn save<T: Serialize>(path: impl AsRef<Path>, value: &T) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)
}

pub fn load<T: DeserializeOwned + Default>(path: impl AsRef<Path>) -> T {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "checkpoint file corrupt, using default");
            T::default()
        }),
        Err(_) => T::default(),
    }
}
