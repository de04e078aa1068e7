//! Mutation engine — the only path by which the agent (or an operator)
//! changes its own homeostatic parameters at runtime. Every accepted
//! mutation is clamped by Guardrails and appended to the hash-chained
//! audit log (spec.md §4.10).

use crate::audit::{AuditError, AuditLog, MutationRecord};
use crate::guardrails::{self, ClampOutcome, GuardrailViolation, RateLimiter, COOLDOWN_SECS_RANGE, RATE_RANGE, THRESHOLD_RANGE, TURNS_PER_HOUR_RANGE, WEIGHT_RANGE};
use pulse_core::Clock;
use pulse_drives::drive::{Drive, DriveEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationCommand {
    Weight { drive: String, value: f32, reason: String },
    Threshold { which: String, value: f32, reason: String },
    Rate { drive: String, value: f32, reason: String },
    Cooldown { value: u32, reason: String },
    TurnsPerHour { value: u32, reason: String },
    DriveAdd { name: String, weight: f32, rate: f32, reason: String },
    DriveRemove { name: String, reason: String },
    DriveCreate { name: String, weight: f32, rate: f32, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MutationOutcome {
    Applied(MutationRecord),
    Blocked { error: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MutationEngineError {
    #[error(transparent)]
    Audit(#[from] AuditError),
}

pub struct MutationEngine {
    audit: AuditLog,
    rate_limiter: Mutex<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl MutationEngine {
    pub fn new(audit: AuditLog, clock: Arc<dyn Clock>) -> Self {
        Self {
            audit,
            rate_limiter: Mutex::new(RateLimiter::default()),
            clock,
        }
    }

    /// Applies a command against the given drive engine, after checking
    /// the rate limiter and running the command through Guardrails.
    /// Validation failures are *not* audited (spec.md §7); clamped
    /// mutations *are* applied and audited with `clamped=true`.
    pub fn apply(&self, engine: &mut DriveEngine, command: MutationCommand) -> Result<MutationOutcome, MutationEngineError> {
        {
            let mut limiter = self.rate_limiter.lock().expect("rate limiter lock poisoned");
            if let Err(GuardrailViolation::RateExceeded(n)) = limiter.check_and_record(self.clock.now_secs()) {
                return Ok(MutationOutcome::Blocked {
                    error: format!("mutation rate exceeded ({n} in the last hour)"),
                });
            }
        }

        let result = match command {
            MutationCommand::Weight { drive, value, reason } => self.apply_weight(engine, &drive, value, &reason),
            MutationCommand::Rate { drive, value, reason } => self.apply_rate(engine, &drive, value, &reason),
            MutationCommand::DriveRemove { name, reason } => self.apply_remove(engine, &name, &reason),
            MutationCommand::DriveAdd { name, weight, rate, reason }
            | MutationCommand::DriveCreate { name, weight, rate, reason } => {
                self.apply_add(engine, &name, weight, rate, &reason)
            }
            MutationCommand::Threshold { which, value, reason } => self.apply_scalar("threshold", &which, value, THRESHOLD_RANGE, &reason),
            MutationCommand::Cooldown { value, reason } => {
                self.apply_scalar_u32("cooldown", "cooldown", value, COOLDOWN_SECS_RANGE, &reason)
            }
            MutationCommand::TurnsPerHour { value, reason } => {
                self.apply_scalar_u32("turns_per_hour", "turns_per_hour", value, TURNS_PER_HOUR_RANGE, &reason)
            }
        };

        match result? {
            Some(record) => Ok(MutationOutcome::Applied(self.audit.append(record)?)),
            None => Ok(MutationOutcome::Blocked {
                error: "mutation validation failed".to_string(),
            }),
        }
    }

    fn apply_weight(&self, engine: &mut DriveEngine, drive_name: &str, value: f32, reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        let current = match engine.get(drive_name) {
            Some(d) => d.weight,
            None => return Ok(None),
        };
        let outcome = guardrails::clamp_field(value, Some(current), WEIGHT_RANGE, Some(guardrails::MAX_DELTA_WEIGHT));
        if let Some(d) = engine.get_mut(drive_name) {
            d.weight = outcome.value;
        }
        Ok(Some(draft_record("weight", drive_name, current, outcome, reason, "mutation_engine")))
    }

    fn apply_rate(&self, engine: &mut DriveEngine, drive_name: &str, value: f32, reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        let current = match engine.get(drive_name) {
            Some(d) => d.rate,
            None => return Ok(None),
        };
        let outcome = guardrails::clamp_field(value, Some(current), RATE_RANGE, Some(guardrails::MAX_DELTA_RATE));
        if let Some(d) = engine.get_mut(drive_name) {
            d.rate = outcome.value;
        }
        Ok(Some(draft_record("rate", drive_name, current, outcome, reason, "mutation_engine")))
    }

    fn apply_remove(&self, engine: &mut DriveEngine, name: &str, reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        if guardrails::assert_removable(name).is_err() {
            return Ok(None);
        }
        if !engine.contains(name) {
            return Ok(None);
        }
        engine.remove_drive(name).ok();
        Ok(Some(MutationRecord {
            ts: 0,
            kind: "drive_remove".to_string(),
            target: name.to_string(),
            before: serde_json::json!({"present": true}),
            after: serde_json::json!({"present": false}),
            reason: reason.to_string(),
            clamped: false,
            clamped_from: None,
            source: "mutation_engine".to_string(),
            prev_hash: String::new(),
            hash: String::new(),
        }))
    }

    fn apply_add(&self, engine: &mut DriveEngine, name: &str, weight: f32, rate: f32, reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        if guardrails::assert_count_within_cap(engine.len(), !engine.contains(name)).is_err() {
            return Ok(None);
        }
        let outcome = guardrails::clamp_field(weight, None, WEIGHT_RANGE, None);
        engine.add_drive(Drive::new(name, outcome.value, rate.clamp(RATE_RANGE.0, RATE_RANGE.1))).ok();
        Ok(Some(MutationRecord {
            ts: 0,
            kind: "drive_create".to_string(),
            target: name.to_string(),
            before: Value::Null,
            after: serde_json::json!({"weight": outcome.value, "rate": rate}),
            reason: reason.to_string(),
            clamped: outcome.clamped,
            clamped_from: outcome.clamped_from.map(|v| serde_json::json!(v)),
            source: "mutation_engine".to_string(),
            prev_hash: String::new(),
            hash: String::new(),
        }))
    }

    fn apply_scalar(&self, kind: &str, target: &str, value: f32, range: (f32, f32), reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        let outcome = guardrails::clamp_field(value, None, range, None);
        Ok(Some(draft_record(kind, target, value, outcome, reason, "mutation_engine")))
    }

    fn apply_scalar_u32(&self, kind: &str, target: &str, value: u32, range: (u32, u32), reason: &str) -> Result<Option<MutationRecord>, MutationEngineError> {
        let clamped = value.clamp(range.0, range.1);
        let outcome = ClampOutcome {
            value: clamped as f32,
            clamped: clamped != value,
            clamped_from: (clamped != value).then_some(value as f32),
        };
        Ok(Some(draft_record(kind, target, value as f32, outcome, reason, "mutation_engine")))
    }
}

fn draft_record(kind: &str, target: &str, before: f32, outcome: ClampOutcome, reason: &str, source: &str) -> MutationRecord {
    MutationRecord {
        ts: 0,
        kind: kind.to_string(),
        target: target.to_string(),
        before: serde_json::json!(before),
        after: serde_json::json!(outcome.value),
        reason: reason.to_string(),
        clamped: outcome.clamped,
        clamped_from: outcome.clamped_from.map(|v| serde_json::json!(v)),
        source: source.to_string(),
        prev_hash: String::new(),
        hash: String::new(),
    }
}
