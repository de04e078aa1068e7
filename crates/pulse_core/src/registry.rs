//! Registry of cross-module collaborators, keyed by name.
//!
//! Several modules read others (Phenotype reads Endocrine, Circadian,
//! Amygdala, Limbic; Aura reads Endocrine, Circadian, Soma, Adipose) and
//! doing that through direct crate imports would create cycles once both
//! directions are needed. Instead every module registers itself here under
//! its own name, and readers look collaborators up by name at call time
//! through this small capability interface. A missing collaborator is
//! treated as "use default values" — nothing here may panic on a miss.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The narrow interface a module exposes to the rest of the nervous system.
pub trait Capability: Send + Sync {
    /// A small status summary, analogous to each module's `get_status()`.
    fn get_status(&self) -> Value;

    /// A single named value from the module's state, or `None` if the
    /// module doesn't expose that key. Never panics on an unknown key.
    fn get(&self, key: &str) -> Option<Value>;
}

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Capability>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.inner
            .write()
            .expect("registry lock poisoned")
            .insert(name.into(), capability);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.inner.read().expect("registry lock poisoned").get(name).cloned()
    }

    /// Convenience used pervasively by readers: a missing collaborator
    /// degrades to `None` rather than an error.
    pub fn status_of(&self, name: &str) -> Option<Value> {
        self.get(name).map(|c| c.get_status())
    }

    pub fn value_of(&self, name: &str, key: &str) -> Option<Value> {
        self.get(name).and_then(|c| c.get(key))
    }
}
