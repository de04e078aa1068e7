//! Dendrite — per-person trust/valence social graph, tracked as an EMA.

use pulse_core::registry::Capability;
use pulse_core::clamp_range;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

const EMA_ALPHA: f32 = 0.15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Relationship {
    trust: f32,
    valence: f32,
}

impl Default for Relationship {
    fn default() -> Self {
        Self {
            trust: 0.5,
            valence: 0.0,
        }
    }
}

pub struct Dendrite {
    relationships: Mutex<HashMap<String, Relationship>>,
}

impl Dendrite {
    pub fn new() -> Self {
        Self {
            relationships: Mutex::new(HashMap::new()),
        }
    }

    pub fn observe(&self, person: &str, trust_delta: f32, valence_delta: f32) {
        let mut relationships = self.relationships.lock().expect("dendrite lock poisoned");
        let entry = relationships.entry(person.to_string()).or_default();
        entry.trust = clamp_range(entry.trust + trust_delta * EMA_ALPHA, 0.0, 1.0);
        entry.valence = clamp_range(entry.valence + valence_delta * EMA_ALPHA, -1.0, 1.0);
    }

    pub fn get_relationship(&self, person: &str) -> Value {
        let relationships = self.relationships.lock().expect("dendrite lock poisoned");
        let r = relationships.get(person).copied().unwrap_or_default();
        serde_json::json!({"trust": r.trust, "valence": r.valence})
    }

    pub fn primary_relationship(&self) -> Option<String> {
        let relationships = self.relationships.lock().expect("dendrite lock poisoned");
        relationships
            .iter()
            .max_by(|a, b| {
                (a.1.trust + a.1.valence)
                    .partial_cmp(&(b.1.trust + b.1.valence))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(name, _)| name.clone())
    }
}

impl Default for Dendrite {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Dendrite {
    fn get_status(&self) -> Value {
        serde_json::json!({
            "tracked_people": self.relationships.lock().expect("dendrite lock poisoned").len(),
            "primary": self.primary_relationship(),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        let relationships = self.relationships.lock().expect("dendrite lock poisoned");
        relationships
            .contains_key(key)
            .then(|| self.get_relationship(key))
    }
}
