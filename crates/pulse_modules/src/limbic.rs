//! Limbic — emotional afterimages: decaying memories of strong emotions.

use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const FADE_FLOOR: f32 = 0.05;
const DEFAULT_HALF_LIFE_MS: i64 = 4 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Afterimage {
    pub emotion: String,
    pub valence: f32,
    pub intensity: f32,
    pub created_at_ms: i64,
    pub half_life_ms: i64,
    pub trigger_note: String,
}

impl Afterimage {
    pub fn current_intensity(&self, now_ms: i64) -> f32 {
        let elapsed = (now_ms - self.created_at_ms).max(0) as f32;
        let exponent = -(elapsed / self.half_life_ms as f32);
        self.intensity * 2f32.powf(exponent)
    }
}

fn half_life_for(emotion: &str) -> i64 {
    match emotion {
        "grief" | "shame" => 12 * 60 * 60 * 1000,
        "joy" | "pride" => 6 * 60 * 60 * 1000,
        "anger" | "fear" => 2 * 60 * 60 * 1000,
        _ => DEFAULT_HALF_LIFE_MS,
    }
}

#[derive(Default)]
struct LimbicState {
    afterimages: Vec<Afterimage>,
}

pub struct Limbic {
    state: Mutex<LimbicState>,
    clock: Arc<dyn Clock>,
}

impl Limbic {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LimbicState::default()),
            clock,
        }
    }

    /// Gated by `|valence|>2 OR intensity>7` on the source's unnormalized
    /// emotion scale; callers pass that scale directly, not the [0,1]
    /// hormone scale.
    pub fn record_emotion(
        &self,
        emotion: impl Into<String>,
        valence: f32,
        intensity: f32,
        trigger_note: impl Into<String>,
    ) -> Option<Afterimage> {
        if valence.abs() <= 2.0 && intensity <= 7.0 {
            return None;
        }
        let emotion = emotion.into();
        let half_life_ms = half_life_for(&emotion);
        let afterimage = Afterimage {
            emotion,
            valence,
            intensity,
            created_at_ms: self.clock.now_ms(),
            half_life_ms,
            trigger_note: trigger_note.into(),
        };
        self.state
            .lock()
            .expect("limbic lock poisoned")
            .afterimages
            .push(afterimage.clone());
        Some(afterimage)
    }

    /// Returns current afterimages above the fade floor; below-floor
    /// entries are garbage-collected as a side effect of the call.
    pub fn get_current_afterimages(&self) -> Vec<(Afterimage, f32)> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().expect("limbic lock poisoned");
        state.afterimages.retain(|a| a.current_intensity(now) > FADE_FLOOR);
        state
            .afterimages
            .iter()
            .map(|a| (a.clone(), a.current_intensity(now)))
            .collect()
    }

    pub fn get_emotional_color(&self) -> Option<(Afterimage, f32)> {
        self.get_current_afterimages()
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl Capability for Limbic {
    fn get_status(&self) -> Value {
        let color = self.get_emotional_color();
        serde_json::json!({
            "active_count": self.get_current_afterimages().len(),
            "dominant": color.map(|(a, i)| serde_json::json!({
                "emotion": a.emotion,
                "current_intensity": i,
            })),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "dominant_emotion" => self
                .get_emotional_color()
                .map(|(a, _)| serde_json::json!(a.emotion)),
            _ => None,
        }
    }
}
