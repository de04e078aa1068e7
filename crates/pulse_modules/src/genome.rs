//! Genome — the exportable, mutable "DNA" of an instance: the named
//! constants that shape the other modules' defaults (decay rates,
//! thresholds, floors). Distinct from runtime `Drive` mutation (handled by
//! the control layer's Guardrails) — Genome covers the constants that are
//! normally fixed per-module but which an operator may want to export,
//! diff, or hand-tune between instances.

use pulse_core::registry::Capability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenomeData {
    #[serde(default = "default_hypothalamus_signal_threshold")]
    pub hypothalamus_signal_threshold: u32,
    #[serde(default = "default_hypothalamus_weight_floor")]
    pub hypothalamus_weight_floor: f32,
    #[serde(default = "default_hypothalamus_retirement_days")]
    pub hypothalamus_retirement_days: i64,
    #[serde(default = "default_limbic_half_life_ms")]
    pub limbic_default_half_life_ms: i64,
    #[serde(default = "default_amygdala_fast_path_threshold")]
    pub amygdala_fast_path_threshold: f32,
    #[serde(default = "default_soma_energy_cost_per_token")]
    pub soma_energy_cost_per_token: f32,
}

fn default_hypothalamus_signal_threshold() -> u32 {
    3
}
fn default_hypothalamus_weight_floor() -> f32 {
    0.1
}
fn default_hypothalamus_retirement_days() -> i64 {
    7
}
fn default_limbic_half_life_ms() -> i64 {
    4 * 60 * 60 * 1000
}
fn default_amygdala_fast_path_threshold() -> f32 {
    0.7
}
fn default_soma_energy_cost_per_token() -> f32 {
    0.00002
}

impl Default for GenomeData {
    fn default() -> Self {
        Self {
            hypothalamus_signal_threshold: default_hypothalamus_signal_threshold(),
            hypothalamus_weight_floor: default_hypothalamus_weight_floor(),
            hypothalamus_retirement_days: default_hypothalamus_retirement_days(),
            limbic_default_half_life_ms: default_limbic_half_life_ms(),
            amygdala_fast_path_threshold: default_amygdala_fast_path_threshold(),
            soma_energy_cost_per_token: default_soma_energy_cost_per_token(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeFieldDiff {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

pub struct Genome {
    data: RwLock<GenomeData>,
}

impl Genome {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GenomeData::default()),
        }
    }

    pub fn export_toml(&self) -> anyhow::Result<String> {
        let data = self.data.read().expect("genome lock poisoned");
        Ok(toml::to_string_pretty(&*data)?)
    }

    pub fn import_toml(&self, text: &str) -> anyhow::Result<()> {
        let parsed: GenomeData = toml::from_str(text)?;
        *self.data.write().expect("genome lock poisoned") = parsed;
        Ok(())
    }

    pub fn show(&self) -> Value {
        serde_json::to_value(&*self.data.read().expect("genome lock poisoned")).unwrap()
    }

    pub fn diff(&self, other: &GenomeData) -> Vec<GenomeFieldDiff> {
        let current = serde_json::to_value(&*self.data.read().expect("genome lock poisoned")).unwrap();
        let other_value = serde_json::to_value(other).unwrap();
        let mut diffs = Vec::new();
        if let (Value::Object(a), Value::Object(b)) = (&current, &other_value) {
            for (field, before) in a {
                let after = b.get(field).cloned().unwrap_or(Value::Null);
                if before != &after {
                    diffs.push(GenomeFieldDiff {
                        field: field.clone(),
                        before: before.clone(),
                        after,
                    });
                }
            }
        }
        diffs
    }
}

impl Default for Genome {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Genome {
    fn get_status(&self) -> Value {
        self.show()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.show().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_then_import_round_trips() {
        let genome = Genome::new();
        let text = genome.export_toml().unwrap();
        let genome2 = Genome::new();
        genome2.import_toml(&text).unwrap();
        assert_eq!(genome.show(), genome2.show());
    }

    #[test]
    fn diff_reports_changed_fields_only() {
        let genome = Genome::new();
        let mut other = GenomeData::default();
        other.amygdala_fast_path_threshold = 0.9;
        let diffs = genome.diff(&other);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "amygdala_fast_path_threshold");
    }
}
