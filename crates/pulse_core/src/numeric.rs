//! NaN/Inf-safe numeric helpers. State modules hold many `f32` fields that
//! are deserialized from JSON written by (or shared with) external
//! processes; a malformed or adversarial write must not poison in-memory
//! state with `NaN`/`Inf`, which would otherwise propagate silently through
//! every downstream clamp.

use serde::{Deserialize, Deserializer};

pub fn clamp01(v: f32) -> f32 {
    clamp_range(v, 0.0, 1.0)
}

pub fn clamp_range(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.max(lo).min(hi)
    }
}

/// Replace non-finite values with `fallback`, logging the substitution.
pub fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("sanitized non-finite f32 ({v}) to {fallback}");
        fallback
    }
}

/// A serde `deserialize_with` that maps `NaN`/`Inf` to `0.0` instead of
/// producing a poisoned value. Attach with
/// `#[serde(deserialize_with = "pulse_core::numeric::deserialize_safe_f32")]`
/// on any `f32` field that round-trips through JSON.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f32::deserialize(deserializer)?;
    Ok(sanitize_f32(raw, 0.0))
}
