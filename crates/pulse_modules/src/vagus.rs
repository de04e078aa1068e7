//! Vagus — a calm/activation scalar, the module Hypothalamus scenario 3
//! names as a `need_signal` source for "connection". No `original_source`
//! file survived for this module; kept deliberately small (see
//! SPEC_FULL.md §3).

use pulse_core::registry::Capability;
use pulse_core::clamp01;
use serde_json::Value;
use std::sync::Mutex;

pub struct Vagus {
    activation: Mutex<f32>,
}

impl Vagus {
    pub fn new() -> Self {
        Self {
            activation: Mutex::new(0.0),
        }
    }

    pub fn update_activation(&self, delta: f32) {
        let mut activation = self.activation.lock().expect("vagus lock poisoned");
        *activation = clamp01(*activation + delta);
    }

    pub fn get_activation(&self) -> f32 {
        *self.activation.lock().expect("vagus lock poisoned")
    }
}

impl Default for Vagus {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Vagus {
    fn get_status(&self) -> Value {
        serde_json::json!({"activation": self.get_activation()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        (key == "activation").then(|| serde_json::json!(self.get_activation()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_clamps_to_unit_interval() {
        let vagus = Vagus::new();
        vagus.update_activation(5.0);
        assert_eq!(vagus.get_activation(), 1.0);
    }
}
