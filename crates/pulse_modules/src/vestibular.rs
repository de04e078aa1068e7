//! Vestibular — balance sense: three ratios (work/rest/social) tracked
//! against healthy ranges.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const HEALTHY_WORK: (f32, f32) = (0.3, 0.7);
const HEALTHY_REST: (f32, f32) = (0.15, 0.4);
const HEALTHY_SOCIAL: (f32, f32) = (0.05, 0.3);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Ratios {
    pub work: f32,
    pub rest: f32,
    pub social: f32,
}

pub struct Vestibular {
    ratios: Mutex<Ratios>,
    bus: Arc<ThalamusBus>,
}

fn out_of_range(value: f32, range: (f32, f32)) -> bool {
    value < range.0 || value > range.1
}

impl Vestibular {
    pub fn new(bus: Arc<ThalamusBus>) -> Self {
        Self {
            ratios: Mutex::new(Ratios::default()),
            bus,
        }
    }

    pub fn update_ratios(&self, work: f32, rest: f32, social: f32) {
        *self.ratios.lock().expect("vestibular lock poisoned") = Ratios { work, rest, social };
        let imbalanced = self.imbalanced();
        if !imbalanced.is_empty() {
            let _ = self
                .bus
                .append("vestibular", "balance_warning", 0.3, serde_json::json!({"imbalanced": imbalanced}));
        }
    }

    fn imbalanced(&self) -> Vec<String> {
        let ratios = *self.ratios.lock().expect("vestibular lock poisoned");
        let mut out = Vec::new();
        if out_of_range(ratios.work, HEALTHY_WORK) {
            out.push("work".to_string());
        }
        if out_of_range(ratios.rest, HEALTHY_REST) {
            out.push("rest".to_string());
        }
        if out_of_range(ratios.social, HEALTHY_SOCIAL) {
            out.push("social".to_string());
        }
        out
    }

    pub fn get_balance(&self) -> Value {
        let ratios = *self.ratios.lock().expect("vestibular lock poisoned");
        serde_json::json!({"ratios": ratios, "imbalanced": self.imbalanced()})
    }
}

impl Capability for Vestibular {
    fn get_status(&self) -> Value {
        self.get_balance()
    }

    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "imbalanced" => Some(serde_json::json!(self.imbalanced())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    fn fresh() -> (Vestibular, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Vestibular::new(bus), dir)
    }

    #[test]
    fn balanced_ratios_report_no_imbalance() {
        let (vestibular, _dir) = fresh();
        vestibular.update_ratios(0.5, 0.25, 0.15);
        assert!(vestibular.imbalanced().is_empty());
    }

    #[test]
    fn excessive_work_ratio_is_flagged_and_broadcast() {
        let (vestibular, _dir) = fresh();
        vestibular.update_ratios(0.9, 0.25, 0.15);
        assert_eq!(vestibular.imbalanced(), vec!["work".to_string()]);
        assert_eq!(vestibular.bus.filter_type("balance_warning").unwrap().len(), 1);
    }
}
