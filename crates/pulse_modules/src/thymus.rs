//! Thymus — skill proficiency tracking via EMA, with plateau detection and
//! milestone broadcasts.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::clamp01;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const EMA_ALPHA: f32 = 0.2;
const PLATEAU_WINDOW: usize = 5;
const PLATEAU_BAND: f32 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SkillRecord {
    level: f32,
    recent_growth: Vec<f32>,
    milestones_reached: Vec<u32>,
}

impl Default for SkillRecord {
    fn default() -> Self {
        Self {
            level: 0.0,
            recent_growth: Vec::new(),
            milestones_reached: Vec::new(),
        }
    }
}

pub struct Thymus {
    skills: Mutex<HashMap<String, SkillRecord>>,
    bus: Arc<ThalamusBus>,
}

impl Thymus {
    pub fn new(bus: Arc<ThalamusBus>) -> Self {
        Self {
            skills: Mutex::new(HashMap::new()),
            bus,
        }
    }

    pub fn record_sample(&self, skill: &str, score: f32) {
        let mut skills = self.skills.lock().expect("thymus lock poisoned");
        let record = skills.entry(skill.to_string()).or_default();
        let before = record.level;
        record.level = clamp01(before * (1.0 - EMA_ALPHA) + clamp01(score) * EMA_ALPHA);
        let growth = record.level - before;
        record.recent_growth.push(growth);
        if record.recent_growth.len() > PLATEAU_WINDOW {
            record.recent_growth.remove(0);
        }

        let decile_before = (before * 10.0) as u32;
        let decile_after = (record.level * 10.0) as u32;
        let crossed: Vec<u32> = (decile_before + 1..=decile_after)
            .filter(|d| !record.milestones_reached.contains(d))
            .collect();
        for d in &crossed {
            record.milestones_reached.push(*d);
        }
        drop(skills);
        for decile in crossed {
            let _ = self.bus.append(
                "thymus",
                "skill_milestone",
                0.3,
                serde_json::json!({"skill": skill, "decile": decile}),
            );
        }
    }

    pub fn get_proficiency(&self, skill: &str) -> Value {
        let skills = self.skills.lock().expect("thymus lock poisoned");
        let record = skills.get(skill);
        let (level, growth_rate, plateaued, milestones) = match record {
            Some(r) => {
                let growth_rate = if r.recent_growth.is_empty() {
                    0.0
                } else {
                    r.recent_growth.iter().sum::<f32>() / r.recent_growth.len() as f32
                };
                let plateaued = r.recent_growth.len() >= PLATEAU_WINDOW
                    && r.recent_growth.iter().all(|g| g.abs() <= PLATEAU_BAND);
                (r.level, growth_rate, plateaued, r.milestones_reached.clone())
            }
            None => (0.0, 0.0, false, Vec::new()),
        };
        serde_json::json!({
            "level": level,
            "growth_rate": growth_rate,
            "plateaued": plateaued,
            "milestones": milestones,
        })
    }
}

impl Capability for Thymus {
    fn get_status(&self) -> Value {
        let skills = self.skills.lock().expect("thymus lock poisoned");
        serde_json::json!({"tracked_skills": skills.len()})
    }

    fn get(&self, key: &str) -> Option<Value> {
        let skills = self.skills.lock().expect("thymus lock poisoned");
        if skills.contains_key(key) {
            Some(self.get_proficiency(key))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::SystemClock;

    fn fresh() -> (Thymus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Thymus::new(bus), dir)
    }

    #[test]
    fn repeated_high_scores_raise_level_and_cross_milestones() {
        let (thymus, _dir) = fresh();
        for _ in 0..30 {
            thymus.record_sample("rust", 1.0);
        }
        let proficiency = thymus.get_proficiency("rust");
        assert!(proficiency["level"].as_f64().unwrap() > 0.9);
        let milestones = thymus.bus.filter_type("skill_milestone").unwrap();
        assert!(!milestones.is_empty());
    }

    #[test]
    fn steady_state_score_eventually_plateaus() {
        let (thymus, _dir) = fresh();
        for _ in 0..50 {
            thymus.record_sample("writing", 0.5);
        }
        let proficiency = thymus.get_proficiency("writing");
        assert!(proficiency["plateaued"].as_bool().unwrap());
    }
}
