//! Nephron — periodic pruning. Per DESIGN.md's Open Question decision,
//! Nephron prunes only the broadcast log and Endocrine's mood-sample
//! history; chronicle entries are never pruned (current source only
//! prunes broadcast and mood history — spec.md §9 Open Question 4).

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use serde_json::Value;
use std::sync::{atomic::AtomicU64, atomic::Ordering, Arc};

pub struct Nephron {
    bus: Arc<ThalamusBus>,
    prune_runs: AtomicU64,
}

impl Nephron {
    pub fn new(bus: Arc<ThalamusBus>) -> Self {
        Self {
            bus,
            prune_runs: AtomicU64::new(0),
        }
    }

    /// Runs during `maintain`. Endocrine already self-trims its own mood
    /// history on every `tick`, so this call's job is the broadcast log.
    pub fn prune(&self) -> std::io::Result<()> {
        self.bus.force_rotation_check()?;
        self.prune_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Capability for Nephron {
    fn get_status(&self) -> Value {
        serde_json::json!({"prune_runs": self.prune_runs.load(Ordering::SeqCst)})
    }

    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}
