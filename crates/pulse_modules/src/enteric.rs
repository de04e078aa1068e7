//! Enteric — the "gut sense": a confidence scalar fed by Amygdala's threat
//! level, standing in for a fast, pre-verbal read on a situation. No
//! `original_source` file survived for this module; kept deliberately
//! small (see SPEC_FULL.md §3).

use pulse_core::registry::Capability;
use pulse_core::clamp01;
use serde_json::Value;
use std::sync::Mutex;

pub struct Enteric {
    gut_sense: Mutex<f32>,
}

impl Enteric {
    pub fn new() -> Self {
        Self {
            gut_sense: Mutex::new(0.0),
        }
    }

    pub fn update_from_threat(&self, threat_effective: f32) {
        *self.gut_sense.lock().expect("enteric lock poisoned") = clamp01(threat_effective);
    }

    pub fn get_gut_sense(&self) -> f32 {
        *self.gut_sense.lock().expect("enteric lock poisoned")
    }
}

impl Default for Enteric {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Enteric {
    fn get_status(&self) -> Value {
        serde_json::json!({"gut_sense": self.get_gut_sense()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        (key == "gut_sense").then(|| serde_json::json!(self.get_gut_sense()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gut_sense_tracks_threat_level() {
        let enteric = Enteric::new();
        enteric.update_from_threat(0.8);
        assert_eq!(enteric.get_gut_sense(), 0.8);
    }
}
