//! Endocrine — the hormone vector and mood label.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::{clamp01, Clock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MOOD_HISTORY_CAP: usize = 500;
const BROADCAST_DELTA_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Hormone {
    Cortisol,
    Dopamine,
    Serotonin,
    Oxytocin,
    Adrenaline,
    Melatonin,
}

impl Hormone {
    fn field(self) -> &'static str {
        match self {
            Hormone::Cortisol => "cortisol",
            Hormone::Dopamine => "dopamine",
            Hormone::Serotonin => "serotonin",
            Hormone::Oxytocin => "oxytocin",
            Hormone::Adrenaline => "adrenaline",
            Hormone::Melatonin => "melatonin",
        }
    }

    /// Per-hour decay rate toward this hormone's baseline. Distinct per
    /// hormone rather than one shared rate, matching the source genome's
    /// per-hormone table.
    fn hourly_decay_rate(self) -> f32 {
        match self {
            Hormone::Cortisol => 0.15,
            Hormone::Dopamine => 0.20,
            Hormone::Serotonin => 0.05,
            Hormone::Oxytocin => 0.10,
            Hormone::Adrenaline => 0.30,
            Hormone::Melatonin => 0.08,
        }
    }

    fn baseline(self) -> f32 {
        match self {
            Hormone::Cortisol => 0.2,
            Hormone::Dopamine => 0.3,
            Hormone::Serotonin => 0.5,
            Hormone::Oxytocin => 0.3,
            Hormone::Adrenaline => 0.0,
            Hormone::Melatonin => 0.1,
        }
    }

    const ALL: [Hormone; 6] = [
        Hormone::Cortisol,
        Hormone::Dopamine,
        Hormone::Serotonin,
        Hormone::Oxytocin,
        Hormone::Adrenaline,
        Hormone::Melatonin,
    ];
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HormoneVector {
    pub cortisol: f32,
    pub dopamine: f32,
    pub serotonin: f32,
    pub oxytocin: f32,
    pub adrenaline: f32,
    pub melatonin: f32,
}

impl HormoneVector {
    /// Starting vector: each hormone at its own baseline rather than zero,
    /// matching the source's `_DEFAULT_GENOME`-seeded defaults.
    fn initial() -> Self {
        let mut v = Self::default();
        for h in Hormone::ALL {
            v.set(h, h.baseline());
        }
        v
    }

    fn get(&self, h: Hormone) -> f32 {
        match h {
            Hormone::Cortisol => self.cortisol,
            Hormone::Dopamine => self.dopamine,
            Hormone::Serotonin => self.serotonin,
            Hormone::Oxytocin => self.oxytocin,
            Hormone::Adrenaline => self.adrenaline,
            Hormone::Melatonin => self.melatonin,
        }
    }

    fn set(&mut self, h: Hormone, v: f32) {
        let v = clamp01(v);
        match h {
            Hormone::Cortisol => self.cortisol = v,
            Hormone::Dopamine => self.dopamine = v,
            Hormone::Serotonin => self.serotonin = v,
            Hormone::Oxytocin => self.oxytocin = v,
            Hormone::Adrenaline => self.adrenaline = v,
            Hormone::Melatonin => self.melatonin = v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MoodSample {
    ts_ms: i64,
    hormones: HormoneVector,
    label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EndocrineState {
    hormones: HormoneVector,
    history: VecDeque<MoodSample>,
}

impl Default for EndocrineState {
    fn default() -> Self {
        Self {
            hormones: HormoneVector::initial(),
            history: VecDeque::new(),
        }
    }
}

pub struct Endocrine {
    state: Mutex<EndocrineState>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
}

/// A named, fixed event → per-hormone delta mapping, analogous to the
/// source's `apply_event` lookup table.
fn event_deltas(event_name: &str) -> Vec<(Hormone, f32)> {
    match event_name {
        "shipped_something" => vec![(Hormone::Dopamine, 0.4), (Hormone::Serotonin, 0.1)],
        "rate_limit_hit" => vec![(Hormone::Cortisol, 0.3), (Hormone::Adrenaline, 0.1)],
        "intimate_conversation" => vec![(Hormone::Oxytocin, 0.3), (Hormone::Serotonin, 0.1)],
        _ => Vec::new(),
    }
}

impl Endocrine {
    pub fn new(bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(EndocrineState::default()),
            bus,
            clock,
        }
    }

    pub fn update_hormone(&self, h: Hormone, delta: f32, reason: &str) {
        let (before, after) = {
            let mut state = self.state.lock().expect("endocrine lock poisoned");
            let before = state.hormones.get(h);
            state.hormones.set(h, before + delta);
            (before, state.hormones.get(h))
        };
        let actual_delta = after - before;
        if actual_delta.abs() > BROADCAST_DELTA_THRESHOLD {
            let salience = clamp01(actual_delta.abs());
            let _ = self.bus.append(
                "endocrine",
                "mood_update",
                salience,
                serde_json::json!({
                    "hormone": h.field(),
                    "delta": actual_delta,
                    "reason": reason,
                }),
            );
        }
    }

    pub fn apply_event(&self, event_name: &str) {
        for (hormone, delta) in event_deltas(event_name) {
            self.update_hormone(hormone, delta, event_name);
        }
    }

    pub fn tick(&self, hours_elapsed: f32) {
        let sample = {
            let mut state = self.state.lock().expect("endocrine lock poisoned");
            for hormone in Hormone::ALL {
                let rate = hormone.hourly_decay_rate() * hours_elapsed;
                let current = state.hormones.get(hormone);
                let baseline = hormone.baseline();
                let next = if current > baseline {
                    (current - rate).max(baseline)
                } else {
                    (current + rate).min(baseline)
                };
                state.hormones.set(hormone, next);
            }
            let label = mood_label(&state.hormones);
            let sample = MoodSample {
                ts_ms: self.clock.now_ms(),
                hormones: state.hormones,
                label,
            };
            state.history.push_back(sample.clone());
            while state.history.len() > MOOD_HISTORY_CAP {
                state.history.pop_front();
            }
            sample
        };
        let _ = sample;
    }

    pub fn get_mood(&self) -> Value {
        let state = self.state.lock().expect("endocrine lock poisoned");
        let label = mood_label(&state.hormones);
        serde_json::json!({
            "hormones": state.hormones,
            "label": label,
            "influence": influence(&state.hormones, &label),
        })
    }
}

fn mood_label(h: &HormoneVector) -> String {
    if h.dopamine >= 0.5 && h.oxytocin >= 0.5 {
        "euphoric".into()
    } else if h.cortisol >= 0.5 && h.serotonin <= 0.0 {
        "burned out".into()
    } else if h.cortisol >= 0.5 && h.dopamine >= 0.5 {
        "wired".into()
    } else if h.dopamine >= 0.5 && h.cortisol < 0.2 {
        "energized".into()
    } else if h.cortisol <= 0.0 && h.dopamine <= 0.0 && h.serotonin <= 0.0 && h.oxytocin <= 0.0 {
        "flat".into()
    } else if h.oxytocin >= 0.5 {
        "bonded".into()
    } else if h.serotonin >= 0.3 && h.cortisol <= 0.3 {
        "content".into()
    } else {
        "neutral".into()
    }
}

fn influence(h: &HormoneVector, label: &str) -> Value {
    serde_json::json!({
        "risk_aversion": clamp01(h.cortisol * 0.8 + (1.0 - h.dopamine) * 0.2),
        "initiative": clamp01(h.dopamine * 0.7 + h.adrenaline * 0.3),
        "creativity": clamp01(h.dopamine * 0.5 + h.oxytocin * 0.3 + (1.0 - h.cortisol) * 0.2),
        "warmth": clamp01(h.oxytocin * 0.8 + h.serotonin * 0.2),
        "label": label,
    })
}

impl Capability for Endocrine {
    fn get_status(&self) -> Value {
        self.get_mood()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("endocrine lock poisoned");
        match key {
            "cortisol" => Some(serde_json::json!(state.hormones.cortisol)),
            "dopamine" => Some(serde_json::json!(state.hormones.dopamine)),
            "serotonin" => Some(serde_json::json!(state.hormones.serotonin)),
            "oxytocin" => Some(serde_json::json!(state.hormones.oxytocin)),
            "adrenaline" => Some(serde_json::json!(state.hormones.adrenaline)),
            "melatonin" => Some(serde_json::json!(state.hormones.melatonin)),
            "label" => Some(serde_json::json!(mood_label(&state.hormones))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    fn fresh() -> (Endocrine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Endocrine::new(bus, Arc::new(SystemClock)), dir)
    }

    #[test]
    fn hormones_always_clamp_to_unit_interval() {
        let (endocrine, _dir) = fresh();
        endocrine.update_hormone(Hormone::Dopamine, 5.0, "test");
        assert_eq!(endocrine.get("dopamine"), Some(serde_json::json!(1.0)));
        endocrine.update_hormone(Hormone::Dopamine, -5.0, "test");
        assert_eq!(endocrine.get("dopamine"), Some(serde_json::json!(0.0)));
    }

    #[test]
    fn ship_then_rate_limit_reaches_wired() {
        let (endocrine, _dir) = fresh();
        endocrine.apply_event("shipped_something");
        endocrine.apply_event("rate_limit_hit");
        assert_eq!(endocrine.get("label"), Some(serde_json::json!("wired")));
        let tail = endocrine.bus.filter_type("mood_update").unwrap();
        assert!(tail.iter().any(|e| e.salience >= 0.3));
    }

    #[test]
    fn mood_label_precedence_checks_euphoric_before_wired() {
        let (endocrine, _dir) = fresh();
        endocrine.update_hormone(Hormone::Dopamine, 0.6, "t");
        endocrine.update_hormone(Hormone::Oxytocin, 0.6, "t");
        endocrine.update_hormone(Hormone::Cortisol, 0.6, "t");
        assert_eq!(endocrine.get("label"), Some(serde_json::json!("euphoric")));
    }

    #[test]
    fn tick_decays_toward_baseline() {
        let (endocrine, _dir) = fresh();
        endocrine.update_hormone(Hormone::Cortisol, 0.9, "t");
        endocrine.tick(10.0);
        let after = endocrine.get("cortisol").unwrap().as_f64().unwrap() as f32;
        assert!(after < 0.9);
        assert!(after >= 0.0);
    }

    #[test]
    fn missing_event_name_is_a_no_op() {
        let (endocrine, _dir) = fresh();
        let before = endocrine.get("dopamine");
        endocrine.apply_event("something_unrecognized");
        assert_eq!(endocrine.get("dopamine"), before);
    }
}
