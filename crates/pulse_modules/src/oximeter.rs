//! Oximeter — compares the agent's self-model against recently recorded
//! external feedback, surfacing the gap between how it sees itself and how
//! others describe it.

use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const FEEDBACK_HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedbackEntry {
    ts: i64,
    text: String,
}

#[derive(Default)]
struct OximeterState {
    feedback: VecDeque<FeedbackEntry>,
}

pub struct Oximeter {
    state: Mutex<OximeterState>,
    clock: Arc<dyn Clock>,
}

impl Oximeter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(OximeterState::default()),
            clock,
        }
    }

    pub fn record_external_feedback(&self, text: impl Into<String>) {
        let mut state = self.state.lock().expect("oximeter lock poisoned");
        state.feedback.push_back(FeedbackEntry {
            ts: self.clock.now_ms(),
            text: text.into(),
        });
        while state.feedback.len() > FEEDBACK_HISTORY_CAP {
            state.feedback.pop_front();
        }
    }

    /// `self_model_summary` is supplied by the caller (typically sourced
    /// from Proprioception through the registry); divergence is a simple
    /// word-overlap measure — 0 means identical vocabulary, 1 means no
    /// shared words at all.
    pub fn gap(&self, self_model_summary: &str) -> Value {
        let state = self.state.lock().expect("oximeter lock poisoned");
        let external_summary: String = state
            .feedback
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let self_words: std::collections::HashSet<&str> = self_model_summary.split_whitespace().collect();
        let external_words: std::collections::HashSet<&str> = external_summary.split_whitespace().collect();
        let divergence = if self_words.is_empty() && external_words.is_empty() {
            0.0
        } else {
            let shared = self_words.intersection(&external_words).count() as f32;
            let total = self_words.union(&external_words).count() as f32;
            if total == 0.0 {
                0.0
            } else {
                1.0 - shared / total
            }
        };

        serde_json::json!({
            "self_model_summary": self_model_summary,
            "external_summary": external_summary,
            "divergence": divergence,
        })
    }
}

impl Capability for Oximeter {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("oximeter lock poisoned");
        serde_json::json!({"feedback_count": state.feedback.len()})
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}
