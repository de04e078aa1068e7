//! Aura — the ambient broadcast: every 60s wall-clock, combine a handful of
//! collaborators' status into one broadcast, degrading gracefully when a
//! collaborator is absent. This is the concrete validation case for the
//! capability-registry design: a missing module never aborts the emit.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::{Clock, Registry};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub const EMIT_INTERVAL_SECS: i64 = 60;

pub struct Aura {
    registry: Registry,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
    last_emit_ms: Mutex<i64>,
}

impl Aura {
    pub fn new(registry: Registry, bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            bus,
            clock,
            last_emit_ms: Mutex::new(0),
        }
    }

    pub fn maybe_emit(&self) -> bool {
        let now = self.clock.now_ms();
        let mut last = self.last_emit_ms.lock().expect("aura lock poisoned");
        if now - *last < EMIT_INTERVAL_SECS * 1000 {
            return false;
        }
        *last = now;
        drop(last);
        self.emit_ambient();
        true
    }

    pub fn emit_ambient(&self) {
        let mut combined = serde_json::Map::new();
        for name in ["endocrine", "circadian", "soma", "adipose"] {
            if let Some(status) = self.registry.status_of(name) {
                combined.insert(name.to_string(), status);
            }
        }
        let _ = self
            .bus
            .append("aura", "ambient", 0.1, Value::Object(combined));
    }
}

impl Capability for Aura {
    fn get_status(&self) -> Value {
        serde_json::json!({"last_emit_ms": *self.last_emit_ms.lock().expect("aura lock poisoned")})
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}
