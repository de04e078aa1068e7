//! In-process synchronous event bus. Separate from the Thalamus: the
//! Thalamus is a durable, file-backed broadcast log meant for cross-process
//! visibility and history; this bus is for same-process "this just
//! happened, act now" fan-out between modules in a single tick, and holds
//! nothing on disk.
//!
//! A handler that panics or returns an error does not take down the other
//! subscribers for that event — each handler is isolated with
//! `catch_unwind`, mirroring the rest of the nervous system's stance that a
//! faulty module degrades instead of crashing the daemon.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Vec<Handler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: impl Into<String>, handler: Handler) {
        self.handlers
            .write()
            .expect("event bus lock poisoned")
            .entry(event.into())
            .or_default()
            .push(handler);
    }

    /// Invoke every handler registered for `event`. Handlers run in
    /// registration order on the calling thread; a handler that panics is
    /// caught and logged, and the remaining handlers still run.
    pub fn publish(&self, event: &str, payload: &Value) {
        let handlers = {
            let guard = self.handlers.read().expect("event bus lock poisoned");
            guard.get(event).cloned().unwrap_or_default()
        };
        for handler in handlers {
            let payload = payload.clone();
            let result = catch_unwind(AssertUnwindSafe(|| handler(&payload)));
            if result.is_err() {
                tracing::error!(event, "event handler panicked, isolating and continuing");
            }
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.handlers
            .read()
            .expect("event bus lock poisoned")
            .get(event)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn publish_invokes_all_subscribers() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        bus.subscribe("drive.trigger", Arc::new(move |_| { c1.fetch_add(1, Ordering::SeqCst); }));
        let c2 = calls.clone();
        bus.subscribe("drive.trigger", Arc::new(move |_| { c2.fetch_add(1, Ordering::SeqCst); }));

        bus.publish("drive.trigger", &serde_json::json!({"drive": "goals"}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn publish_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish("nothing.listens", &serde_json::json!({}));
        assert_eq!(bus.subscriber_count("nothing.listens"), 0);
    }

    #[test]
    fn panicking_handler_does_not_stop_remaining_handlers() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe("evt", Arc::new(|_| panic!("boom")));
        let c = calls.clone();
        bus.subscribe("evt", Arc::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));

        bus.publish("evt", &serde_json::json!({}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
