//! Spine — the health monitor: runs probes, derives a level per probe, and
//! decides which cron categories are paused.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Green,
    Yellow,
    Orange,
    Red,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Green => "green",
            Level::Yellow => "yellow",
            Level::Orange => "orange",
            Level::Red => "red",
        }
    }

    fn from_ratio(ratio: f32, yellow: f32, orange: f32, red: f32) -> Level {
        if ratio >= red {
            Level::Red
        } else if ratio >= orange {
            Level::Orange
        } else if ratio >= yellow {
            Level::Yellow
        } else {
            Level::Green
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeInputs {
    pub token_usage_ratio: f32,
    pub context_size_ratio: f32,
    pub cron_success_ratio: f32,
    pub provider_mean_latency_s: f32,
    pub provider_recent_success_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub probe: String,
    pub level: String,
}

struct SpineState {
    last_levels: Vec<(String, Level)>,
}

pub struct Spine {
    state: Mutex<SpineState>,
    bus: Arc<ThalamusBus>,
}

impl Spine {
    pub fn new(bus: Arc<ThalamusBus>) -> Self {
        Self {
            state: Mutex::new(SpineState {
                last_levels: Vec::new(),
            }),
            bus,
        }
    }

    pub fn run_probes(&self, inputs: &ProbeInputs) -> Vec<Alert> {
        let token_usage = Level::from_ratio(inputs.token_usage_ratio, 0.35, 0.70, 0.95);
        // context_size has its own, steeper table (50/80/90/95).
        let context_size = Level::from_ratio(inputs.context_size_ratio, 0.50, 0.80, 0.95);
        let cron_health = Level::from_ratio(1.0 - inputs.cron_success_ratio, 0.20, 0.40, 0.70);
        let provider_latency_level =
            Level::from_ratio(inputs.provider_mean_latency_s / 15.0, 0.33, 0.66, 1.0);
        let provider_success_level =
            Level::from_ratio(1.0 - inputs.provider_recent_success_ratio, 0.20, 0.40, 0.70);
        let provider_health = provider_latency_level.max(provider_success_level);

        let levels = vec![
            ("token_usage".to_string(), token_usage),
            ("context_size".to_string(), context_size),
            ("cron_health".to_string(), cron_health),
            ("provider_health".to_string(), provider_health),
        ];

        let mut state = self.state.lock().expect("spine lock poisoned");
        for (probe, level) in &levels {
            let changed = state
                .last_levels
                .iter()
                .find(|(p, _)| p == probe)
                .map(|(_, l)| *l != *level)
                .unwrap_or(true);
            if changed {
                let _ = self.bus.append(
                    "spine",
                    "health",
                    0.3,
                    serde_json::json!({"probe": probe, "level": level.as_str()}),
                );
            }
        }
        state.last_levels = levels.clone();
        drop(state);

        let mut alerts: Vec<Alert> = levels
            .into_iter()
            .filter(|(_, l)| *l >= Level::Yellow)
            .map(|(probe, level)| Alert {
                probe,
                level: level.as_str().to_string(),
            })
            .collect();
        alerts.sort_by(|a, b| b.level.cmp(&a.level));
        alerts
    }

    pub fn max_level(&self) -> Level {
        self.state
            .lock()
            .expect("spine lock poisoned")
            .last_levels
            .iter()
            .map(|(_, l)| *l)
            .max()
            .unwrap_or(Level::Green)
    }

    pub fn pauses_non_essential(&self) -> bool {
        self.max_level() >= Level::Orange
    }

    pub fn pauses_all_crons(&self) -> bool {
        self.max_level() == Level::Red
    }
}

impl Capability for Spine {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("spine lock poisoned");
        serde_json::json!({
            "levels": state.last_levels.iter().map(|(p, l)| serde_json::json!({"probe": p, "level": l.as_str()})).collect::<Vec<_>>(),
            "max_level": self.max_level().as_str(),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "max_level" => Some(serde_json::json!(self.max_level().as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    fn fresh() -> (Spine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Spine::new(bus), dir)
    }

    #[test]
    fn healthy_inputs_stay_green() {
        let (spine, _dir) = fresh();
        let alerts = spine.run_probes(&ProbeInputs {
            token_usage_ratio: 0.1,
            context_size_ratio: 0.1,
            cron_success_ratio: 1.0,
            provider_mean_latency_s: 0.5,
            provider_recent_success_ratio: 1.0,
        });
        assert!(alerts.is_empty());
        assert_eq!(spine.max_level(), Level::Green);
    }

    #[test]
    fn high_token_usage_reaches_red_and_pauses_all() {
        let (spine, _dir) = fresh();
        spine.run_probes(&ProbeInputs {
            token_usage_ratio: 0.97,
            ..Default::default()
        });
        assert_eq!(spine.max_level(), Level::Red);
        assert!(spine.pauses_all_crons());
    }

    #[test]
    fn orange_pauses_non_essential_but_not_all() {
        let (spine, _dir) = fresh();
        spine.run_probes(&ProbeInputs {
            token_usage_ratio: 0.80,
            ..Default::default()
        });
        assert_eq!(spine.max_level(), Level::Orange);
        assert!(spine.pauses_non_essential());
        assert!(!spine.pauses_all_crons());
    }

    #[test]
    fn level_change_emits_health_broadcast() {
        let (spine, _dir) = fresh();
        spine.run_probes(&ProbeInputs::default());
        spine.run_probes(&ProbeInputs {
            token_usage_ratio: 0.97,
            ..Default::default()
        });
        let entries = spine.bus.filter_type("health").unwrap();
        assert!(entries.iter().any(|e| e.data["level"] == "red"));
    }
}
