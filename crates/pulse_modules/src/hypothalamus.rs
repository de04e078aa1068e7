//! Hypothalamus — the meta-drive layer: births new drives out of
//! cross-module `need_signal` events, and retires stale ones.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

const NORMAL_THRESHOLD: usize = 3;
const REDUCED_THRESHOLD: usize = 2;
const REDUCED_NEED_SET: &[&str] = &["connection", "social", "belonging", "companionship"];
const RETIREMENT_AGE_DAYS: i64 = 7;
const WEIGHT_FLOOR: f32 = 0.1;
const DECAY_PER_SCAN: f32 = 0.01;
const FLOOR_DURATION_DAYS: i64 = 30;
const RETIREMENT_RECORD_CAP: usize = 50;

fn threshold_for(need: &str) -> usize {
    if REDUCED_NEED_SET.contains(&need) {
        REDUCED_THRESHOLD
    } else {
        NORMAL_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PendingSignal {
    modules: HashSet<String>,
    first_seen_ms: i64,
    last_seen_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BornDrive {
    name: String,
    born_at_ms: i64,
    weight: f32,
    reached_floor_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementRecord {
    pub name: String,
    pub born_at_ms: i64,
    pub retired_at_ms: i64,
}

#[derive(Default)]
struct HypothalamusState {
    pending: HashMap<String, PendingSignal>,
    born: HashMap<String, BornDrive>,
    retirements: VecDeque<RetirementRecord>,
}

pub struct Hypothalamus {
    state: Mutex<HypothalamusState>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
    existing_drive: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Hypothalamus {
    /// `existing_drive` lets the caller report whether a drive with a given
    /// name already exists in the drive engine, without this module
    /// depending on `pulse_drives` directly (that would invert the layer
    /// order).
    pub fn new(
        bus: Arc<ThalamusBus>,
        clock: Arc<dyn Clock>,
        existing_drive: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(HypothalamusState::default()),
            bus,
            clock,
            existing_drive: Box::new(existing_drive),
        }
    }

    /// Handle one `need_signal` event. Returns the drive name if this call
    /// caused a birth.
    pub fn on_need_signal(&self, need: &str, source_module: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().expect("hypothalamus lock poisoned");

        if (self.existing_drive)(need) {
            state.pending.remove(need);
            return None;
        }

        let entry = state.pending.entry(need.to_string()).or_insert_with(|| PendingSignal {
            modules: HashSet::new(),
            first_seen_ms: now,
            last_seen_ms: now,
        });
        entry.modules.insert(source_module.to_string());
        entry.last_seen_ms = now;

        if entry.modules.len() >= threshold_for(need) {
            state.pending.remove(need);
            state.born.insert(
                need.to_string(),
                BornDrive {
                    name: need.to_string(),
                    born_at_ms: now,
                    weight: 1.0,
                    reached_floor_at_ms: None,
                },
            );
            drop(state);
            let _ = self
                .bus
                .append("hypothalamus", "drive_born", 0.4, serde_json::json!({"drive": need}));
            return Some(need.to_string());
        }
        None
    }

    /// Periodic maintenance: decay weights of drives older than the
    /// retirement age, and retire ones that have sat at the floor long
    /// enough.
    pub fn scan_drives(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let mut retired = Vec::new();
        let mut state = self.state.lock().expect("hypothalamus lock poisoned");
        let mut to_remove = Vec::new();

        for drive in state.born.values_mut() {
            let age_days = (now - drive.born_at_ms) / (24 * 60 * 60 * 1000);
            if age_days >= RETIREMENT_AGE_DAYS {
                drive.weight = (drive.weight - DECAY_PER_SCAN).max(WEIGHT_FLOOR);
            }
            if drive.weight <= WEIGHT_FLOOR {
                if drive.reached_floor_at_ms.is_none() {
                    drive.reached_floor_at_ms = Some(now);
                }
            } else {
                drive.reached_floor_at_ms = None;
            }
            if let Some(floor_since) = drive.reached_floor_at_ms {
                let floor_days = (now - floor_since) / (24 * 60 * 60 * 1000);
                if floor_days >= FLOOR_DURATION_DAYS {
                    to_remove.push(drive.name.clone());
                }
            }
        }

        for name in &to_remove {
            if let Some(drive) = state.born.remove(name) {
                retired.push(name.clone());
                state.retirements.push_back(RetirementRecord {
                    name: drive.name,
                    born_at_ms: drive.born_at_ms,
                    retired_at_ms: now,
                });
                while state.retirements.len() > RETIREMENT_RECORD_CAP {
                    state.retirements.pop_front();
                }
            }
        }
        drop(state);
        for name in &retired {
            let _ = self
                .bus
                .append("hypothalamus", "drive_retired", 0.3, serde_json::json!({"drive": name}));
        }
        retired
    }
}

impl Capability for Hypothalamus {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("hypothalamus lock poisoned");
        serde_json::json!({
            "pending_signals": state.pending.len(),
            "born_drives": state.born.len(),
            "retirement_count": state.retirements.len(),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("hypothalamus lock poisoned");
        if key == "retirements" {
            return Some(serde_json::json!(state.retirements));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{SystemClock, TestClock};

    fn fresh() -> (Hypothalamus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (
            Hypothalamus::new(bus, Arc::new(SystemClock), |_| false),
            dir,
        )
    }

    #[test]
    fn normal_need_requires_three_distinct_modules() {
        let (hypo, _dir) = fresh();
        assert!(hypo.on_need_signal("curiosity", "amygdala").is_none());
        assert!(hypo.on_need_signal("curiosity", "soma").is_none());
        assert!(hypo.on_need_signal("curiosity", "dendrite").is_some());
    }

    #[test]
    fn reduced_threshold_need_births_at_two_modules() {
        let (hypo, _dir) = fresh();
        assert!(hypo.on_need_signal("connection", "vagus").is_none());
        let born = hypo.on_need_signal("connection", "limbic");
        assert_eq!(born, Some("connection".to_string()));
    }

    #[test]
    fn repeated_signal_from_same_module_does_not_count_twice() {
        let (hypo, _dir) = fresh();
        assert!(hypo.on_need_signal("curiosity", "amygdala").is_none());
        assert!(hypo.on_need_signal("curiosity", "amygdala").is_none());
        assert_eq!(hypo.get_status()["pending_signals"], serde_json::json!(1));
    }

    #[test]
    fn drive_retires_after_floor_duration() {
        let clock = Arc::new(TestClock::new(0));
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        let hypo = Hypothalamus::new(bus, clock.clone(), |_| false);
        hypo.on_need_signal("novelty", "a");
        hypo.on_need_signal("novelty", "b");
        hypo.on_need_signal("novelty", "c");

        // Age past the retirement-age cutoff, then scan enough times to
        // decay weight 1.0 -> 0.1 at 0.01/scan (90 scans), each scan
        // representing one day so the floor duration also elapses.
        for _ in 0..130 {
            clock.advance_ms(24 * 60 * 60 * 1000);
            hypo.scan_drives();
        }
        assert_eq!(hypo.get_status()["born_drives"], serde_json::json!(0));
        assert_eq!(hypo.get_status()["retirement_count"], serde_json::json!(1));
    }
}
