//! Cerebellum — habit detection and graduation of repeated tasks into
//! replayable scripts.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const MAX_SAMPLES: usize = 10;
const SIMILARITY_THRESHOLD: f32 = 0.85;
const MIN_SAMPLES_FOR_DETECTION: usize = 5;
const GRADUATION_DETECTIONS: u32 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitRecord {
    pub task_name: String,
    pub sample_outputs: VecDeque<String>,
    pub similarity_score: f32,
    pub graduations_detected: u32,
    pub graduated_script_path: Option<PathBuf>,
}

pub struct Cerebellum {
    habits: Mutex<HashMap<String, HabitRecord>>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
    script_dir: PathBuf,
}

/// Jaccard similarity over whitespace token bags — the teacher-neutral,
/// deterministic choice for "cosine-like" per spec's Open Question.
fn jaccard(a: &str, b: &str) -> f32 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count() as f32;
    let union = ta.union(&tb).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn average_pairwise_similarity(samples: &VecDeque<String>) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut count = 0;
    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            total += jaccard(&samples[i], &samples[j]);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

impl Cerebellum {
    pub fn new(bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>, script_dir: PathBuf) -> Self {
        Self {
            habits: Mutex::new(HashMap::new()),
            bus,
            clock,
            script_dir,
        }
    }

    pub fn record_output(&self, task_name: &str, output: impl Into<String>) {
        let mut habits = self.habits.lock().expect("cerebellum lock poisoned");
        let record = habits.entry(task_name.to_string()).or_insert_with(|| HabitRecord {
            task_name: task_name.to_string(),
            ..Default::default()
        });
        record.sample_outputs.push_back(output.into());
        while record.sample_outputs.len() > MAX_SAMPLES {
            record.sample_outputs.pop_front();
        }
        record.similarity_score = average_pairwise_similarity(&record.sample_outputs);
    }

    /// One detection pass over all tracked tasks. Returns the task names
    /// that just crossed their third consecutive detection.
    pub fn detect(&self) -> Vec<String> {
        let mut graduated_now = Vec::new();
        let mut habits = self.habits.lock().expect("cerebellum lock poisoned");
        for record in habits.values_mut() {
            if record.sample_outputs.len() >= MIN_SAMPLES_FOR_DETECTION
                && record.similarity_score >= SIMILARITY_THRESHOLD
            {
                record.graduations_detected += 1;
                if record.graduations_detected >= GRADUATION_DETECTIONS
                    && record.graduated_script_path.is_none()
                {
                    graduated_now.push(record.task_name.clone());
                }
            } else {
                record.graduations_detected = 0;
            }
        }
        drop(habits);
        for task in &graduated_now {
            self.graduate_task(task);
        }
        graduated_now
    }

    pub fn graduate_task(&self, task_name: &str) -> Option<PathBuf> {
        let mut habits = self.habits.lock().expect("cerebellum lock poisoned");
        let record = habits.get_mut(task_name)?;
        let script_path = self.script_dir.join(format!("{task_name}.replay"));
        record.graduated_script_path = Some(script_path.clone());
        drop(habits);
        let _ = self.bus.append(
            "cerebellum",
            "habit_graduated",
            0.5,
            serde_json::json!({"task": task_name, "script_path": script_path}),
        );
        Some(script_path)
    }

    pub fn should_use_habit(&self, task_name: &str) -> Option<PathBuf> {
        self.habits
            .lock()
            .expect("cerebellum lock poisoned")
            .get(task_name)
            .and_then(|r| r.graduated_script_path.clone())
    }

    pub fn escalate(&self, task_name: &str, reason: &str) {
        let mut habits = self.habits.lock().expect("cerebellum lock poisoned");
        if let Some(record) = habits.get_mut(task_name) {
            record.graduated_script_path = None;
            record.graduations_detected = 0;
        }
        drop(habits);
        let _ = self.bus.append(
            "cerebellum",
            "habit_escalated",
            0.4,
            serde_json::json!({"task": task_name, "reason": reason, "ts": self.clock.now_ms()}),
        );
    }
}

impl Capability for Cerebellum {
    fn get_status(&self) -> Value {
        let habits = self.habits.lock().expect("cerebellum lock poisoned");
        serde_json::json!({
            "tracked_tasks": habits.len(),
            "graduated_tasks": habits.values().filter(|r| r.graduated_script_path.is_some()).count(),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.habits
            .lock()
            .expect("cerebellum lock poisoned")
            .get(key)
            .map(|r| serde_json::json!(r))
    }
}
