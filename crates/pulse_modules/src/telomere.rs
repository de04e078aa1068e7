//! Telomere — identity drift detection: hashes the agent's identity
//! document and compares it against the most recent monthly snapshot.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub drifted: bool,
    pub current_hash: String,
    pub snapshot_hash: Option<String>,
}

#[derive(Default)]
struct TelomereState {
    snapshot_hash: Option<String>,
    snapshot_ts_ms: Option<i64>,
}

pub struct Telomere {
    state: Mutex<TelomereState>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
}

fn hash_contents(contents: &str) -> String {
    let digest = Sha256::digest(contents.as_bytes());
    format!("{digest:x}")
}

impl Telomere {
    pub fn new(bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(TelomereState::default()),
            bus,
            clock,
        }
    }

    pub fn check_drift(&self, soul_md_path: &Path) -> std::io::Result<DriftReport> {
        let contents = std::fs::read_to_string(soul_md_path)?;
        let current_hash = hash_contents(&contents);
        let mut state = self.state.lock().expect("telomere lock poisoned");
        let drifted = state
            .snapshot_hash
            .as_ref()
            .map(|h| h != &current_hash)
            .unwrap_or(false);
        let snapshot_hash = state.snapshot_hash.clone();

        if state.snapshot_hash.is_none() || drifted {
            state.snapshot_hash = Some(current_hash.clone());
            state.snapshot_ts_ms = Some(self.clock.now_ms());
        }
        drop(state);

        if drifted {
            let _ = self.bus.append(
                "telomere",
                "identity_drift",
                0.6,
                serde_json::json!({"current_hash": current_hash, "previous_hash": snapshot_hash}),
            );
        }

        Ok(DriftReport {
            drifted,
            current_hash,
            snapshot_hash,
        })
    }
}

impl Capability for Telomere {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("telomere lock poisoned");
        serde_json::json!({
            "snapshot_hash": state.snapshot_hash,
            "snapshot_ts_ms": state.snapshot_ts_ms,
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("telomere lock poisoned");
        match key {
            "snapshot_hash" => state.snapshot_hash.clone().map(|h| serde_json::json!(h)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    fn fresh() -> (Telomere, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Telomere::new(bus, Arc::new(SystemClock)), dir)
    }

    #[test]
    fn first_check_establishes_snapshot_without_drift() {
        let (telomere, dir) = fresh();
        let soul = dir.path().join("SOUL.md");
        std::fs::write(&soul, "I am an agent.").unwrap();
        let report = telomere.check_drift(&soul).unwrap();
        assert!(!report.drifted);
    }

    #[test]
    fn later_change_is_detected_as_drift() {
        let (telomere, dir) = fresh();
        let soul = dir.path().join("SOUL.md");
        std::fs::write(&soul, "I am an agent.").unwrap();
        telomere.check_drift(&soul).unwrap();

        std::fs::write(&soul, "I am a different agent now.").unwrap();
        let report = telomere.check_drift(&soul).unwrap();
        assert!(report.drifted);
        let entries = telomere.bus.filter_type("identity_drift").unwrap();
        assert_eq!(entries.len(), 1);
    }
}
