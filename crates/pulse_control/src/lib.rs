pub mod audit;
pub mod daemon;
pub mod evaluator;
pub mod guardrails;
pub mod mutation;
pub mod webhook;

pub use audit::{AuditLog, MutationRecord};
pub use daemon::Daemon;
pub use evaluator::{evaluate, TriggerDecision};
pub use mutation::{MutationCommand, MutationEngine, MutationOutcome};
