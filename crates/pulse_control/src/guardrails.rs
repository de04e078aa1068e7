//! Guardrails — fixed numeric limits the mutation engine clamps every
//! command against. Values are taken verbatim from spec.md §4.11.

use pulse_drives::drive::{MAX_DRIVE_COUNT, MAX_WEIGHT, MIN_WEIGHT, PROTECTED_DRIVES};

pub const WEIGHT_RANGE: (f32, f32) = (MIN_WEIGHT, MAX_WEIGHT);
pub const RATE_RANGE: (f32, f32) = (0.001, 0.1);
pub const THRESHOLD_RANGE: (f32, f32) = (0.2, 0.95);
pub const TURNS_PER_HOUR_RANGE: (u32, u32) = (1, 30);
pub const COOLDOWN_SECS_RANGE: (u32, u32) = (60, 3600);

pub const MAX_DELTA_WEIGHT: f32 = 0.5;
pub const MAX_DELTA_THRESHOLD: f32 = 0.15;
pub const MAX_DELTA_RATE: f32 = 0.02;

pub const MAX_MUTATIONS_PER_HOUR: usize = 10;
const RATE_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardrailViolation {
    #[error("drive '{0}' is protected and cannot be removed")]
    ProtectedDrive(String),
    #[error("drive count would exceed the cap of {MAX_DRIVE_COUNT}")]
    DriveCountExceeded,
    #[error("mutation rate exceeded: {0} mutations in the last hour (cap {MAX_MUTATIONS_PER_HOUR})")]
    RateExceeded(usize),
}

/// The outcome of clamping a single numeric field against its guardrail
/// range and, if supplied, a maximum per-mutation delta from its current
/// value.
pub struct ClampOutcome {
    pub value: f32,
    pub clamped: bool,
    pub clamped_from: Option<f32>,
}

pub fn clamp_field(requested: f32, current: Option<f32>, range: (f32, f32), max_delta: Option<f32>) -> ClampOutcome {
    let range_clamped = requested.clamp(range.0, range.1);
    let mut value = range_clamped;
    let mut clamped = range_clamped != requested;

    // The absolute range is the harder invariant: only enforce the
    // per-mutation delta when the request already lands inside it. A
    // request that overshoots the range is capped at the range boundary
    // regardless of how far that is from `current`.
    if !clamped {
        if let (Some(current), Some(max_delta)) = (current, max_delta) {
            let delta = value - current;
            if delta.abs() > max_delta {
                value = (current + max_delta.copysign(delta)).clamp(range.0, range.1);
                clamped = true;
            }
        }
    }

    ClampOutcome {
        value,
        clamped,
        clamped_from: clamped.then_some(requested),
    }
}

pub fn assert_removable(drive_name: &str) -> Result<(), GuardrailViolation> {
    if PROTECTED_DRIVES.contains(&drive_name) {
        return Err(GuardrailViolation::ProtectedDrive(drive_name.to_string()));
    }
    Ok(())
}

pub fn assert_count_within_cap(current_count: usize, adding_new: bool) -> Result<(), GuardrailViolation> {
    if adding_new && current_count >= MAX_DRIVE_COUNT {
        return Err(GuardrailViolation::DriveCountExceeded);
    }
    Ok(())
}

/// Tracks mutation timestamps (seconds) over a rolling hour so the engine
/// can refuse a request that would exceed the per-hour cap. Pruned on
/// every check, per spec.md §4.11's "persisted timestamp list, pruned
/// older than 3600 s".
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct RateLimiter {
    timestamps: Vec<i64>,
}

impl RateLimiter {
    pub fn check_and_record(&mut self, now_secs: i64) -> Result<(), GuardrailViolation> {
        self.timestamps.retain(|ts| now_secs - ts < RATE_WINDOW_SECS);
        if self.timestamps.len() >= MAX_MUTATIONS_PER_HOUR {
            return Err(GuardrailViolation::RateExceeded(self.timestamps.len()));
        }
        self.timestamps.push(now_secs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_field_respects_hard_range() {
        let outcome = clamp_field(10.0, None, WEIGHT_RANGE, None);
        assert_eq!(outcome.value, MAX_WEIGHT);
        assert!(outcome.clamped);
        assert_eq!(outcome.clamped_from, Some(10.0));
    }

    #[test]
    fn clamp_field_respects_max_delta() {
        let outcome = clamp_field(2.0, Some(1.0), WEIGHT_RANGE, Some(MAX_DELTA_WEIGHT));
        assert_eq!(outcome.value, 1.5);
        assert!(outcome.clamped);
    }

    #[test]
    fn clamp_field_leaves_in_range_values_alone() {
        let outcome = clamp_field(1.2, Some(1.0), WEIGHT_RANGE, Some(MAX_DELTA_WEIGHT));
        assert_eq!(outcome.value, 1.2);
        assert!(!outcome.clamped);
        assert_eq!(outcome.clamped_from, None);
    }

    #[test]
    fn protected_drives_are_rejected() {
        assert!(assert_removable("goals").is_err());
        assert!(assert_removable("whatever").is_ok());
    }

    #[test]
    fn rate_limiter_allows_up_to_cap_then_refuses() {
        let mut limiter = RateLimiter::default();
        for i in 0..MAX_MUTATIONS_PER_HOUR {
            limiter.check_and_record(i as i64).unwrap();
        }
        assert!(limiter.check_and_record(MAX_MUTATIONS_PER_HOUR as i64).is_err());
    }

    #[test]
    fn rate_limiter_prunes_entries_older_than_window() {
        let mut limiter = RateLimiter::default();
        for i in 0..MAX_MUTATIONS_PER_HOUR {
            limiter.check_and_record(i as i64).unwrap();
        }
        // Far enough in the future that all prior entries fall outside the window.
        assert!(limiter.check_and_record(RATE_WINDOW_SECS + 1000).is_ok());
    }
}
