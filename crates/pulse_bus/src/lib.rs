//! The L0 bus layer: the durable Thalamus broadcast log, the in-process
//! event bus, and the `PulseContext` that threads both (plus config, clock,
//! and the module registry) down into every higher layer.

pub mod context;
pub mod event_bus;
pub mod thalamus;

pub use context::PulseContext;
pub use event_bus::EventBus;
pub use thalamus::{BroadcastEntry, ThalamusBus};
