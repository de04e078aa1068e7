//! `PulseContext` bundles the handful of things nearly every module
//! constructor needs — where to persist state, how to read time, and how to
//! reach the two buses — so that those constructors take one argument
//! instead of four or five.

use crate::event_bus::EventBus;
use crate::thalamus::ThalamusBus;
use pulse_core::{Clock, PulseConfig, Registry, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct PulseContext {
    pub state_dir: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub bus: Arc<ThalamusBus>,
    pub event_bus: EventBus,
    pub config: Arc<PulseConfig>,
    pub registry: Registry,
}

impl PulseContext {
    /// Build a context rooted at `config.pulse.state_dir`, using the real
    /// system clock.
    pub fn new(config: PulseConfig) -> std::io::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PulseConfig, clock: Arc<dyn Clock>) -> std::io::Result<Self> {
        let state_dir = config.pulse.state_dir.clone();
        let bus = Arc::new(ThalamusBus::new(&state_dir, clock.clone())?);
        Ok(Self {
            state_dir,
            clock,
            bus,
            event_bus: EventBus::new(),
            config: Arc::new(config),
            registry: Registry::new(),
        })
    }

    /// Path for a module's own state file, e.g. `state_dir/endocrine.json`.
    pub fn module_state_path(&self, module: &str) -> PathBuf {
        self.state_dir.join(format!("{module}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_creates_state_dir_and_is_cloneable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PulseConfig::default();
        config.pulse.state_dir = dir.path().join("state");
        let ctx = PulseContext::new(config).unwrap();
        assert!(ctx.state_dir.exists());

        let clone = ctx.clone();
        clone.bus.append("test", "ping", 0.1, serde_json::json!({})).unwrap();
        let tail = ctx.bus.tail(1).unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn module_state_path_is_namespaced_under_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PulseConfig::default();
        config.pulse.state_dir = dir.path().join("state");
        let ctx = PulseContext::new(config).unwrap();
        assert_eq!(
            ctx.module_state_path("endocrine"),
            ctx.state_dir.join("endocrine.json")
        );
    }
}
