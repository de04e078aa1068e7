//! Phenotype — derives a communication style from mood, circadian mode,
//! threat level, and the dominant afterimage, reading its collaborators
//! through the registry so it never imports them directly.

use pulse_core::registry::Capability;
use pulse_core::Registry;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunicationStyle {
    Urgent,
    Terse,
    Reflective,
    Warm,
    Direct,
    Neutral,
}

impl CommunicationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationStyle::Urgent => "urgent",
            CommunicationStyle::Terse => "terse",
            CommunicationStyle::Reflective => "reflective",
            CommunicationStyle::Warm => "warm",
            CommunicationStyle::Direct => "direct",
            CommunicationStyle::Neutral => "neutral",
        }
    }
}

pub struct Phenotype {
    registry: Registry,
}

impl Phenotype {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Ordered rules, first match wins — mirroring Endocrine's own label
    /// derivation idiom.
    pub fn derive_style(&self) -> CommunicationStyle {
        let threat_level = self
            .registry
            .value_of("amygdala", "last_max_effective")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        if threat_level >= 0.7 {
            return CommunicationStyle::Urgent;
        }

        let circadian_mode = self
            .registry
            .value_of("circadian", "mode")
            .and_then(|v| v.as_str().map(str::to_string));
        if circadian_mode.as_deref() == Some("deep_night") {
            return CommunicationStyle::Terse;
        }

        let dominant_emotion = self.registry.value_of("limbic", "dominant_emotion");
        if dominant_emotion.is_some() {
            return CommunicationStyle::Reflective;
        }

        let mood_label = self
            .registry
            .value_of("endocrine", "label")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "neutral".to_string());

        match mood_label.as_str() {
            "bonded" | "euphoric" | "content" => CommunicationStyle::Warm,
            "wired" | "energized" => CommunicationStyle::Direct,
            _ => CommunicationStyle::Neutral,
        }
    }
}

impl Capability for Phenotype {
    fn get_status(&self) -> Value {
        serde_json::json!({"style": self.derive_style().as_str()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "style" => Some(serde_json::json!(self.derive_style().as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    struct Stub(Value);
    impl Capability for Stub {
        fn get_status(&self) -> Value {
            self.0.clone()
        }
        fn get(&self, key: &str) -> Option<Value> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn no_collaborators_defaults_to_neutral() {
        let registry = Registry::new();
        let phenotype = Phenotype::new(registry);
        assert_eq!(phenotype.derive_style(), CommunicationStyle::Neutral);
    }

    #[test]
    fn high_threat_overrides_everything_to_urgent() {
        let registry = Registry::new();
        registry.register("amygdala", Arc::new(Stub(json!({"last_max_effective": 0.9}))));
        registry.register("endocrine", Arc::new(Stub(json!({"label": "bonded"}))));
        let phenotype = Phenotype::new(registry);
        assert_eq!(phenotype.derive_style(), CommunicationStyle::Urgent);
    }

    #[test]
    fn deep_night_biases_toward_terse_absent_threat() {
        let registry = Registry::new();
        registry.register("circadian", Arc::new(Stub(json!({"mode": "deep_night"}))));
        let phenotype = Phenotype::new(registry);
        assert_eq!(phenotype.derive_style(), CommunicationStyle::Terse);
    }

    #[test]
    fn mood_label_maps_to_warm_style() {
        let registry = Registry::new();
        registry.register("endocrine", Arc::new(Stub(json!({"label": "bonded"}))));
        let phenotype = Phenotype::new(registry);
        assert_eq!(phenotype.derive_style(), CommunicationStyle::Warm);
    }
}
