//! Buffer — a small ring of recent sensor snapshots, giving the evaluator
//! a short window of `sensor_context` to draw on beyond the immediate
//! tick. No `original_source` file survived for this module; kept
//! deliberately small (see SPEC_FULL.md §3).

use pulse_core::registry::Capability;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

const RING_CAPACITY: usize = 20;

pub struct Buffer {
    recent: Mutex<VecDeque<Value>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    pub fn push(&self, snapshot: Value) {
        let mut recent = self.recent.lock().expect("buffer lock poisoned");
        recent.push_back(snapshot);
        while recent.len() > RING_CAPACITY {
            recent.pop_front();
        }
    }

    pub fn recent(&self, n: usize) -> Vec<Value> {
        let recent = self.recent.lock().expect("buffer lock poisoned");
        let start = recent.len().saturating_sub(n);
        recent.iter().skip(start).cloned().collect()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Buffer {
    fn get_status(&self) -> Value {
        serde_json::json!({"len": self.recent.lock().expect("buffer lock poisoned").len()})
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let buffer = Buffer::new();
        for i in 0..(RING_CAPACITY + 5) {
            buffer.push(serde_json::json!({"i": i}));
        }
        assert_eq!(buffer.recent(RING_CAPACITY + 5).len(), RING_CAPACITY);
    }
}
