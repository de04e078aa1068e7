//! Shared types for Pulse: configuration, clock injection, numeric clamping
//! helpers, and the capability-registry pattern used to decouple modules
//! that would otherwise need to import each other directly.

pub mod clock;
pub mod config;
pub mod numeric;
pub mod registry;

pub use clock::{Clock, SystemClock, TestClock};
pub use config::PulseConfig;
pub use numeric::{clamp01, clamp_range, sanitize_f32};
pub use registry::{Capability, Registry};

use thiserror::Error;

/// Error taxonomy shared across the workspace. Individual crates add their
/// own narrower error types (e.g. `GuardrailViolation`) and convert into
/// this one at the boundary where a caller needs a single error type.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("guardrail violation: {0}")]
    GuardrailViolation(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type PulseResult<T> = std::result::Result<T, PulseError>;
