//! Proprioception — the agent's model of its own capabilities. Contract
//! inferred from Mirror's usage (`get_self_model() -> {model, limitations,
//! tools_available, external_feedback_ts, external_feedback_count}`); no
//! `original_source` file survived for this module.

use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ProprioceptionState {
    model: String,
    limitations: Vec<String>,
    tools_available: Vec<String>,
    external_feedback_ts: Option<i64>,
    external_feedback_count: u64,
}

pub struct Proprioception {
    state: Mutex<ProprioceptionState>,
    clock: Arc<dyn Clock>,
}

impl Proprioception {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ProprioceptionState::default()),
            clock,
        }
    }

    pub fn set_model(&self, model: impl Into<String>, limitations: Vec<String>, tools_available: Vec<String>) {
        let mut state = self.state.lock().expect("proprioception lock poisoned");
        state.model = model.into();
        state.limitations = limitations;
        state.tools_available = tools_available;
    }

    pub fn note_external_feedback(&self) {
        let mut state = self.state.lock().expect("proprioception lock poisoned");
        state.external_feedback_ts = Some(self.clock.now_ms());
        state.external_feedback_count += 1;
    }

    pub fn get_self_model(&self) -> Value {
        let state = self.state.lock().expect("proprioception lock poisoned");
        serde_json::json!({
            "model": state.model,
            "limitations": state.limitations,
            "tools_available": state.tools_available,
            "external_feedback_ts": state.external_feedback_ts,
            "external_feedback_count": state.external_feedback_count,
        })
    }
}

impl Capability for Proprioception {
    fn get_status(&self) -> Value {
        self.get_self_model()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.get_self_model().get(key).cloned()
    }
}
