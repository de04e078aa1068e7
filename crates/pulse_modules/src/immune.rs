//! Immune — tracks a small set of "threats" the agent has already adapted
//! to, so the same pattern doesn't re-alarm every tick. No
//! `original_source` file survived for this module; kept deliberately
//! small (see SPEC_FULL.md §3).

use pulse_core::registry::Capability;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

pub struct Immune {
    adapted: Mutex<HashSet<String>>,
}

impl Immune {
    pub fn new() -> Self {
        Self {
            adapted: Mutex::new(HashSet::new()),
        }
    }

    pub fn mark_adapted(&self, pattern: &str) {
        self.adapted.lock().expect("immune lock poisoned").insert(pattern.to_string());
    }

    pub fn is_adapted(&self, pattern: &str) -> bool {
        self.adapted.lock().expect("immune lock poisoned").contains(pattern)
    }
}

impl Default for Immune {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Immune {
    fn get_status(&self) -> Value {
        serde_json::json!({"adapted_count": self.adapted.lock().expect("immune lock poisoned").len()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        Some(serde_json::json!(self.is_adapted(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_patterns_are_reported_adapted() {
        let immune = Immune::new();
        assert!(!immune.is_adapted("rate_limit_hit"));
        immune.mark_adapted("rate_limit_hit");
        assert!(immune.is_adapted("rate_limit_hit"));
    }
}
