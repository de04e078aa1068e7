//! Soma — body-state tracking: energy, posture, temperature, and biosensor
//! ingestion. The only module that currently participates in the daemon
//! loop's pre-sense phase (Open Question 2 in DESIGN.md).

use pulse_core::registry::Capability;
use pulse_core::{clamp01, Clock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const ENERGY_COST_PER_TOKEN: f32 = 0.00002;
const ENERGY_RECOVERY_PER_SEC_DEEP_SLEEP: f32 = 0.0005;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiosensorSnapshot {
    pub last_update_epoch_s: i64,
    pub heart_rate_bpm: Option<f32>,
    pub sleep_stage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SomaState {
    energy: f32,
    posture: f32,
    temperature: f32,
    last_biosensor_ts: Option<i64>,
}

impl Default for SomaState {
    fn default() -> Self {
        Self {
            energy: 1.0,
            posture: 1.0,
            temperature: 0.5,
            last_biosensor_ts: None,
        }
    }
}

pub struct Soma {
    state: Mutex<SomaState>,
    clock: Arc<dyn Clock>,
}

impl Soma {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(SomaState::default()),
            clock,
        }
    }

    pub fn ingest_biosensor(&self, snapshot: &BiosensorSnapshot) {
        let mut state = self.state.lock().expect("soma lock poisoned");
        state.last_biosensor_ts = Some(snapshot.last_update_epoch_s);
        if snapshot.sleep_stage.as_deref() == Some("deep") {
            state.energy = clamp01(state.energy + ENERGY_RECOVERY_PER_SEC_DEEP_SLEEP);
        }
    }

    pub fn charge_tokens(&self, token_count: u64) {
        let mut state = self.state.lock().expect("soma lock poisoned");
        state.energy = clamp01(state.energy - ENERGY_COST_PER_TOKEN * token_count as f32);
    }

    pub fn tick(&self, _seconds_elapsed: f32) {
        // Reserved for future passive recovery/decay; currently energy only
        // changes via explicit charge/biosensor events.
    }

    pub fn get_status(&self) -> Value {
        let state = self.state.lock().expect("soma lock poisoned");
        serde_json::json!({
            "energy": state.energy,
            "posture": state.posture,
            "temperature": state.temperature,
            "last_biosensor_ts": state.last_biosensor_ts,
        })
    }
}

impl Capability for Soma {
    fn get_status(&self) -> Value {
        Soma::get_status(self)
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("soma lock poisoned");
        match key {
            "energy" => Some(serde_json::json!(state.energy)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    #[test]
    fn charging_tokens_drains_energy() {
        let soma = Soma::new(Arc::new(SystemClock));
        let before = soma.get("energy").unwrap().as_f64().unwrap();
        soma.charge_tokens(10_000);
        let after = soma.get("energy").unwrap().as_f64().unwrap();
        assert!(after < before);
    }

    #[test]
    fn deep_sleep_recovers_energy() {
        let soma = Soma::new(Arc::new(SystemClock));
        soma.charge_tokens(100_000);
        let before = soma.get("energy").unwrap().as_f64().unwrap();
        soma.ingest_biosensor(&BiosensorSnapshot {
            last_update_epoch_s: 0,
            heart_rate_bpm: None,
            sleep_stage: Some("deep".into()),
        });
        let after = soma.get("energy").unwrap().as_f64().unwrap();
        assert!(after > before);
    }
}
