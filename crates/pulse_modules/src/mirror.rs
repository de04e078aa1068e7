//! Mirror — bidirectional comparison between two markdown model files,
//! using MD5 purely as a fast change-detector (not an identity hash —
//! Telomere's SHA-256 serves that role for the identity document).

use pulse_core::registry::Capability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorReport {
    pub a_hash: String,
    pub b_hash: String,
    pub a_changed_since_last: bool,
    pub b_changed_since_last: bool,
}

#[derive(Default)]
struct MirrorState {
    last_a_hash: Option<String>,
    last_b_hash: Option<String>,
}

pub struct Mirror {
    state: Mutex<MirrorState>,
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let contents = std::fs::read(path)?;
    Ok(format!("{:x}", md5::compute(contents)))
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MirrorState::default()),
        }
    }

    pub fn compare(&self, model_a_path: &Path, model_b_path: &Path) -> std::io::Result<MirrorReport> {
        let a_hash = hash_file(model_a_path)?;
        let b_hash = hash_file(model_b_path)?;
        let mut state = self.state.lock().expect("mirror lock poisoned");
        let a_changed = state.last_a_hash.as_ref().map(|h| h != &a_hash).unwrap_or(false);
        let b_changed = state.last_b_hash.as_ref().map(|h| h != &b_hash).unwrap_or(false);
        state.last_a_hash = Some(a_hash.clone());
        state.last_b_hash = Some(b_hash.clone());
        Ok(MirrorReport {
            a_hash,
            b_hash,
            a_changed_since_last: a_changed,
            b_changed_since_last: b_changed,
        })
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Mirror {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("mirror lock poisoned");
        serde_json::json!({"last_a_hash": state.last_a_hash, "last_b_hash": state.last_b_hash})
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_comparison_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "Josh's model").unwrap();
        std::fs::write(&b, "Iris's model").unwrap();
        let mirror = Mirror::new();
        let report = mirror.compare(&a, &b).unwrap();
        assert!(!report.a_changed_since_last);
        assert!(!report.b_changed_since_last);
    }

    #[test]
    fn second_comparison_detects_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "original").unwrap();
        std::fs::write(&b, "original").unwrap();
        let mirror = Mirror::new();
        mirror.compare(&a, &b).unwrap();

        std::fs::write(&a, "revised").unwrap();
        let report = mirror.compare(&a, &b).unwrap();
        assert!(report.a_changed_since_last);
        assert!(!report.b_changed_since_last);
    }
}
