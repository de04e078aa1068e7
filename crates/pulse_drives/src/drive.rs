//! Drive engine — named homeostatic accumulators that build pressure over
//! time and get relieved by triggering. Grounded on the `Drive` record in
//! spec.md §3 and the birth/retirement contract in `hypothalamus.rs`.

use pulse_core::clamp_range;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MIN_WEIGHT: f32 = 0.05;
pub const MAX_WEIGHT: f32 = 3.0;
pub const MAX_DRIVE_COUNT: usize = 15;

pub const PROTECTED_DRIVES: [&str; 2] = ["goals", "growth"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub name: String,
    pub weight: f32,
    pub pressure: f32,
    pub rate: f32,
    pub decay: Option<f32>,
}

impl Drive {
    pub fn new(name: impl Into<String>, weight: f32, rate: f32) -> Self {
        Self {
            name: name.into(),
            weight: clamp_range(weight, MIN_WEIGHT, MAX_WEIGHT),
            pressure: 0.0,
            rate,
            decay: None,
        }
    }

    pub fn weighted_pressure(&self) -> f32 {
        self.weight * self.pressure
    }

    fn accrue(&mut self, hours_elapsed: f32) {
        self.pressure += self.rate * hours_elapsed;
        if let Some(decay) = self.decay {
            self.pressure = (self.pressure - decay * hours_elapsed).max(0.0);
        }
        self.pressure = self.pressure.max(0.0);
    }
}

/// Snapshot of all drives at a point in time, taken by value so the
/// evaluator is insulated from later mutation within the same tick.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriveSnapshot {
    pub drives: Vec<Drive>,
}

impl DriveSnapshot {
    pub fn total_pressure(&self) -> f32 {
        self.drives.iter().map(|d| d.weighted_pressure()).sum()
    }

    pub fn top_drive(&self) -> Option<&Drive> {
        self.drives
            .iter()
            .max_by(|a, b| a.weighted_pressure().partial_cmp(&b.weighted_pressure()).unwrap())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DriveEngine {
    drives: HashMap<String, Drive>,
}

impl DriveEngine {
    pub fn new() -> Self {
        let mut drives = HashMap::new();
        drives.insert("goals".to_string(), Drive::new("goals", 1.0, 0.01));
        drives.insert("growth".to_string(), Drive::new("growth", 1.0, 0.01));
        Self { drives }
    }

    /// Builds an engine from a list of `(name, weight, rate, decay)` tuples,
    /// as read from config. Falls back to the default `goals`/`growth` pair
    /// for any protected drive the config omits.
    pub fn from_configs(configs: impl IntoIterator<Item = (String, f32, f32, Option<f32>)>) -> Self {
        let mut engine = Self::new();
        for (name, weight, rate, decay) in configs {
            let mut drive = Drive::new(&name, weight, rate);
            drive.decay = decay;
            engine.drives.insert(name, drive);
        }
        engine
    }

    pub fn add_drive(&mut self, drive: Drive) -> Result<(), String> {
        if self.drives.len() >= MAX_DRIVE_COUNT && !self.drives.contains_key(&drive.name) {
            return Err(format!("drive count already at cap of {MAX_DRIVE_COUNT}"));
        }
        self.drives.insert(drive.name.clone(), drive);
        Ok(())
    }

    pub fn remove_drive(&mut self, name: &str) -> Result<(), String> {
        if PROTECTED_DRIVES.contains(&name) {
            return Err(format!("drive '{name}' is protected and cannot be removed"));
        }
        self.drives.remove(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Drive> {
        self.drives.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Drive> {
        self.drives.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drives.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    /// Applies per-tick rate and decay accretion to every drive.
    pub fn accumulate(&mut self, hours_elapsed: f32) {
        for drive in self.drives.values_mut() {
            drive.accrue(hours_elapsed);
        }
    }

    /// Adds an ad-hoc pressure bump to a named drive, e.g. from a
    /// cross-module signal (Hypothalamus birth, Amygdala threat).
    pub fn add_pressure(&mut self, name: &str, amount: f32) {
        if let Some(drive) = self.drives.get_mut(name) {
            drive.pressure = (drive.pressure + amount).max(0.0);
        }
    }

    /// Relieves a drive's pressure back to zero after it has triggered.
    pub fn relieve(&mut self, name: &str) {
        if let Some(drive) = self.drives.get_mut(name) {
            drive.pressure = 0.0;
        }
    }

    pub fn snapshot(&self) -> DriveSnapshot {
        let mut drives: Vec<Drive> = self.drives.values().cloned().collect();
        drives.sort_by(|a, b| a.name.cmp(&b.name));
        DriveSnapshot { drives }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_drives_survive_removal_attempts() {
        let mut engine = DriveEngine::new();
        assert!(engine.remove_drive("goals").is_err());
        assert!(engine.remove_drive("growth").is_err());
        assert!(engine.contains("goals"));
        assert!(engine.contains("growth"));
    }

    #[test]
    fn drive_count_is_capped() {
        let mut engine = DriveEngine::new();
        for i in 0..(MAX_DRIVE_COUNT - 2) {
            engine
                .add_drive(Drive::new(format!("d{i}"), 1.0, 0.01))
                .unwrap();
        }
        assert_eq!(engine.len(), MAX_DRIVE_COUNT);
        assert!(engine.add_drive(Drive::new("overflow", 1.0, 0.01)).is_err());
    }

    #[test]
    fn weight_is_clamped_on_construction() {
        let drive = Drive::new("x", 99.0, 0.01);
        assert_eq!(drive.weight, MAX_WEIGHT);
        let drive = Drive::new("y", -1.0, 0.01);
        assert_eq!(drive.weight, MIN_WEIGHT);
    }

    #[test]
    fn snapshot_is_insulated_from_later_mutation() {
        let mut engine = DriveEngine::new();
        engine.add_pressure("goals", 2.0);
        let snapshot = engine.snapshot();
        let before = snapshot.total_pressure();
        engine.add_pressure("goals", 100.0);
        assert_eq!(snapshot.total_pressure(), before);
    }

    #[test]
    fn from_configs_seeds_named_drives() {
        let engine = DriveEngine::from_configs(vec![
            ("goals".to_string(), 1.5, 0.02, None),
            ("curiosity".to_string(), 0.8, 0.01, Some(0.001)),
        ]);
        assert_eq!(engine.get("goals").unwrap().weight, 1.5);
        assert!(engine.contains("growth"));
        assert_eq!(engine.get("curiosity").unwrap().decay, Some(0.001));
    }

    #[test]
    fn accumulate_applies_rate_and_decay() {
        let mut engine = DriveEngine::new();
        if let Some(d) = engine.get_mut("goals") {
            d.decay = Some(0.005);
        }
        engine.accumulate(2.0);
        let pressure = engine.get("goals").unwrap().pressure;
        assert!(pressure > 0.0);
    }
}
