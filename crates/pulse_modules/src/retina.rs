//! Retina — holds the circadian-derived ambient light threshold consumers
//! use to decide how much visual/attentional detail to surface. No
//! `original_source` file survived for this module; its one field
//! (`retina_threshold`) is named directly in Circadian's mode-settings
//! payload (spec.md §4.3), so Retina just mirrors that value behind its own
//! capability.

use pulse_core::registry::Capability;
use pulse_core::Registry;
use serde_json::Value;

pub struct Retina {
    registry: Registry,
}

impl Retina {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn get_threshold(&self) -> f32 {
        self.registry
            .get("circadian")
            .and_then(|c| c.get_status().get("retina_threshold").and_then(|v| v.as_f64()))
            .map(|v| v as f32)
            .unwrap_or(0.5)
    }
}

impl Capability for Retina {
    fn get_status(&self) -> Value {
        serde_json::json!({"retina_threshold": self.get_threshold()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        (key == "retina_threshold").then(|| serde_json::json!(self.get_threshold()))
    }
}
