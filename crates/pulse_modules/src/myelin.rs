//! Myelin — shorthand compression lexicon.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PROMOTION_REFERENCE_COUNT: u32 = 3;
const DEMOTION_STALE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

fn blocklist() -> &'static [&'static str] {
    &["josh", "iris", "happy", "sad", "angry", "afraid", "love"]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackingEntry {
    full_text: String,
    references: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub full_text: String,
    pub references: u32,
    pub last_used_ms: i64,
    pub created_ms: i64,
    pub pre_seeded: bool,
}

#[derive(Default)]
struct MyelinState {
    tracking: HashMap<String, TrackingEntry>,
    concepts: HashMap<String, Concept>,
}

pub struct Myelin {
    state: Mutex<MyelinState>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
}

fn is_blocked(phrase: &str) -> bool {
    let lower = phrase.to_lowercase();
    blocklist().iter().any(|b| lower == *b)
}

fn shorthand_for(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("-")
}

impl Myelin {
    pub fn new(bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MyelinState::default()),
            bus,
            clock,
        }
    }

    pub fn preseed(&self, full_text: impl Into<String>, shorthand: impl Into<String>) {
        let full_text = full_text.into();
        let shorthand = shorthand.into();
        let now = self.clock.now_ms();
        self.state.lock().expect("myelin lock poisoned").concepts.insert(
            shorthand,
            Concept {
                full_text,
                references: 0,
                last_used_ms: now,
                created_ms: now,
                pre_seeded: true,
            },
        );
    }

    /// Record one utterance of `phrase`. Promotes to the concept set once
    /// the reference threshold is crossed.
    pub fn observe(&self, phrase: &str) -> Option<String> {
        if is_blocked(phrase) {
            return None;
        }
        let now = self.clock.now_ms();
        let mut state = self.state.lock().expect("myelin lock poisoned");

        if let Some((shorthand, concept)) = state
            .concepts
            .iter_mut()
            .find(|(_, c)| c.full_text == phrase)
        {
            concept.references += 1;
            concept.last_used_ms = now;
            return Some(shorthand.clone());
        }

        let entry = state
            .tracking
            .entry(phrase.to_string())
            .or_insert_with(|| TrackingEntry {
                full_text: phrase.to_string(),
                references: 0,
            });
        entry.references += 1;

        if entry.references >= PROMOTION_REFERENCE_COUNT {
            let shorthand = shorthand_for(phrase);
            let references = entry.references;
            state.tracking.remove(phrase);
            state.concepts.insert(
                shorthand.clone(),
                Concept {
                    full_text: phrase.to_string(),
                    references,
                    last_used_ms: now,
                    created_ms: now,
                    pre_seeded: false,
                },
            );
            drop(state);
            let _ = self.bus.append(
                "myelin",
                "shorthand_promoted",
                0.2,
                serde_json::json!({"shorthand": shorthand, "full_text": phrase}),
            );
            return Some(shorthand);
        }
        None
    }

    pub fn compress(&self, text: &str) -> String {
        let state = self.state.lock().expect("myelin lock poisoned");
        let mut result = text.to_string();
        let mut concepts: Vec<_> = state.concepts.iter().collect();
        concepts.sort_by_key(|(_, c)| std::cmp::Reverse(c.full_text.len()));
        for (shorthand, concept) in concepts {
            result = result.replace(&concept.full_text, &format!("[{shorthand}]"));
        }
        result
    }

    pub fn expand(&self, text: &str) -> String {
        let state = self.state.lock().expect("myelin lock poisoned");
        let mut result = text.to_string();
        for (shorthand, concept) in state.concepts.iter() {
            result = result.replace(&format!("[{shorthand}]"), &concept.full_text);
        }
        result
    }

    /// Periodic lexicon maintenance: demote non-pre-seeded concepts unused
    /// for `DEMOTION_STALE_MS`.
    pub fn update_lexicon(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().expect("myelin lock poisoned");
        let stale: Vec<String> = state
            .concepts
            .iter()
            .filter(|(_, c)| !c.pre_seeded && now - c.last_used_ms >= DEMOTION_STALE_MS)
            .map(|(s, _)| s.clone())
            .collect();
        for shorthand in &stale {
            state.concepts.remove(shorthand);
        }
        drop(state);
        if !stale.is_empty() {
            let _ = self
                .bus
                .append("myelin", "shorthand_demoted", 0.1, serde_json::json!({"demoted": stale}));
        }
    }
}

impl Capability for Myelin {
    fn get_status(&self) -> Value {
        let state = self.state.lock().expect("myelin lock poisoned");
        serde_json::json!({
            "tracking_count": state.tracking.len(),
            "concept_count": state.concepts.len(),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("myelin lock poisoned");
        state.concepts.get(key).map(|c| serde_json::json!(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{SystemClock, TestClock};

    fn fresh() -> (Myelin, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        (Myelin::new(bus, Arc::new(SystemClock)), dir)
    }

    #[test]
    fn phrase_promotes_after_threshold_references() {
        let (myelin, _dir) = fresh();
        assert!(myelin.observe("check the deployment status").is_none());
        assert!(myelin.observe("check the deployment status").is_none());
        let shorthand = myelin.observe("check the deployment status");
        assert!(shorthand.is_some());
    }

    #[test]
    fn round_trip_holds_when_no_shorthand_literal_present() {
        let (myelin, _dir) = fresh();
        for _ in 0..3 {
            myelin.observe("run the full test suite");
        }
        let text = "please run the full test suite before merging";
        let compressed = myelin.compress(text);
        assert_ne!(compressed, text);
        assert_eq!(myelin.expand(&compressed), text);
    }

    #[test]
    fn blocklisted_tokens_are_never_tracked() {
        let (myelin, _dir) = fresh();
        for _ in 0..5 {
            assert!(myelin.observe("josh").is_none());
        }
        assert_eq!(myelin.get_status()["tracking_count"], serde_json::json!(0));
    }

    #[test]
    fn stale_non_preseeded_concept_is_demoted() {
        let clock = Arc::new(TestClock::new(0));
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        let myelin = Myelin::new(bus, clock.clone());
        for _ in 0..3 {
            myelin.observe("deploy the new release");
        }
        clock.advance_ms(8 * 24 * 60 * 60 * 1000);
        myelin.update_lexicon();
        assert_eq!(myelin.get_status()["concept_count"], serde_json::json!(0));
    }

    #[test]
    fn preseeded_concept_survives_update_lexicon() {
        let clock = Arc::new(TestClock::new(0));
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(ThalamusBus::new(dir.path(), Arc::new(SystemClock)).unwrap());
        let myelin = Myelin::new(bus, clock.clone());
        myelin.preseed("as soon as possible", "ASAP");
        clock.advance_ms(30 * 24 * 60 * 60 * 1000);
        myelin.update_lexicon();
        assert_eq!(myelin.get_status()["concept_count"], serde_json::json!(1));
    }
}
