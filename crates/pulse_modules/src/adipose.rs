//! Adipose — energy/budget reserves. Contract inferred from Aura's usage
//! (`get_budget_report() -> {categories: {<name>: {percent_used}}}`); no
//! `original_source` file survived for this module.

use pulse_core::registry::Capability;
use pulse_core::clamp01;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct Adipose {
    percent_used: Mutex<HashMap<String, f32>>,
}

impl Adipose {
    pub fn new() -> Self {
        Self {
            percent_used: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_usage(&self, category: &str, percent_used: f32) {
        self.percent_used
            .lock()
            .expect("adipose lock poisoned")
            .insert(category.to_string(), clamp01(percent_used));
    }

    pub fn get_budget_report(&self) -> Value {
        let usage = self.percent_used.lock().expect("adipose lock poisoned");
        let categories: serde_json::Map<String, Value> = usage
            .iter()
            .map(|(name, pct)| (name.clone(), serde_json::json!({"percent_used": pct})))
            .collect();
        serde_json::json!({"categories": categories})
    }
}

impl Default for Adipose {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Adipose {
    fn get_status(&self) -> Value {
        self.get_budget_report()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.percent_used
            .lock()
            .expect("adipose lock poisoned")
            .get(key)
            .map(|v| serde_json::json!(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_report_reflects_recorded_usage() {
        let adipose = Adipose::new();
        adipose.record_usage("conversation", 0.4);
        let report = adipose.get_budget_report();
        assert_eq!(report["categories"]["conversation"]["percent_used"], serde_json::json!(0.4));
    }
}
