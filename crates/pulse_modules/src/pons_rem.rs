//! Pons-REM — a dream/consolidation placeholder, ticked during `maintain`.
//! No `original_source` file survived for this module; kept deliberately
//! small (see SPEC_FULL.md §3). Holds a single consolidation scalar that
//! rises while the agent is otherwise idle and resets on any trigger.

use pulse_core::registry::Capability;
use pulse_core::clamp01;
use serde_json::Value;
use std::sync::Mutex;

pub struct PonsRem {
    consolidation: Mutex<f32>,
}

impl PonsRem {
    pub fn new() -> Self {
        Self {
            consolidation: Mutex::new(0.0),
        }
    }

    pub fn tick_idle(&self, amount: f32) {
        let mut consolidation = self.consolidation.lock().expect("pons_rem lock poisoned");
        *consolidation = clamp01(*consolidation + amount);
    }

    pub fn reset_on_trigger(&self) {
        *self.consolidation.lock().expect("pons_rem lock poisoned") = 0.0;
    }

    pub fn get_consolidation(&self) -> f32 {
        *self.consolidation.lock().expect("pons_rem lock poisoned")
    }
}

impl Default for PonsRem {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for PonsRem {
    fn get_status(&self) -> Value {
        serde_json::json!({"consolidation": self.get_consolidation()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        (key == "consolidation").then(|| serde_json::json!(self.get_consolidation()))
    }
}
