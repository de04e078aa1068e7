//! Chronicle — the significance-filtered historian: an append-only JSONL
//! record of events worth remembering.

use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const SIGNIFICANCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChronicleEntry {
    ts: i64,
    event: String,
    salience: f32,
}

pub struct Chronicle {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    recorded_count: Mutex<u64>,
}

impl Chronicle {
    pub fn new(state_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: state_dir.as_ref().join("chronicle.jsonl"),
            clock,
            recorded_count: Mutex::new(0),
        }
    }

    /// Returns whether the event passed the significance threshold and was
    /// recorded.
    pub fn record(&self, event: &str, salience: f32) -> std::io::Result<bool> {
        if salience < SIGNIFICANCE_THRESHOLD {
            return Ok(false);
        }
        let entry = ChronicleEntry {
            ts: self.clock.now_ms(),
            event: event.to_string(),
            salience,
        };
        let line = serde_json::to_string(&entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        *self.recorded_count.lock().expect("chronicle lock poisoned") += 1;
        Ok(true)
    }
}

impl Capability for Chronicle {
    fn get_status(&self) -> Value {
        serde_json::json!({
            "recorded_count": *self.recorded_count.lock().expect("chronicle lock poisoned"),
        })
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    #[test]
    fn below_threshold_events_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let chronicle = Chronicle::new(dir.path(), Arc::new(SystemClock));
        assert!(!chronicle.record("minor thing", 0.2).unwrap());
        assert!(!dir.path().join("chronicle.jsonl").exists());
    }

    #[test]
    fn above_threshold_events_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let chronicle = Chronicle::new(dir.path(), Arc::new(SystemClock));
        assert!(chronicle.record("shipped the release", 0.8).unwrap());
        let contents = std::fs::read_to_string(dir.path().join("chronicle.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
