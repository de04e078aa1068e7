//! Property-based tests for the universal invariants spanning guardrail
//! clamping, evaluator monotonicity, and audit chain integrity.

use pulse_control::audit::AuditLog;
use pulse_control::evaluate;
use pulse_core::config::EvaluatorRules;
use pulse_core::{Clock, SystemClock};
use pulse_drives::drive::Drive;
use pulse_drives::sensors::ConversationState;
use pulse_drives::{DriveSnapshot, SensorSnapshot};
use proptest::prelude::*;
use std::sync::Arc;

fn idle_sensors() -> SensorSnapshot {
    SensorSnapshot {
        filesystem: vec![],
        system: vec![],
        conversation: ConversationState {
            active: false,
            in_cooldown: false,
            seconds_since: 9999,
        },
    }
}

fn rules() -> EvaluatorRules {
    EvaluatorRules {
        single_drive_threshold: 2.0,
        combined_threshold: 6.0,
        suppress_during_conversation: true,
    }
}

proptest! {
    /// `clamp_field` always returns a value within the requested range,
    /// regardless of the requested value, the current value, or the
    /// maximum per-mutation delta.
    #[test]
    fn clamp_field_output_always_in_range(
        requested in -100.0f32..=100.0,
        current in -100.0f32..=100.0,
        max_delta in 0.01f32..=10.0,
    ) {
        let range = (0.05f32, 3.0f32);
        let outcome = pulse_control::guardrails::clamp_field(requested, Some(current), range, Some(max_delta));
        prop_assert!(outcome.value >= range.0 && outcome.value <= range.1);
        prop_assert!(outcome.value.is_finite());
    }

    /// **Evaluator monotonicity.** Holding sensors, rules, and the trigger
    /// history fixed, raising a single drive's pressure can never flip
    /// `should_trigger` from true to false (every rule that depends on
    /// pressure is a `>=`/`>` threshold check).
    #[test]
    fn raising_pressure_never_untriggers(lo in 0.0f32..=5.0, delta in 0.0f32..=20.0) {
        let hi = lo + delta;
        let mut snap_lo = DriveSnapshot::default();
        let mut d = Drive::new("goals", 2.0, 0.0);
        d.pressure = lo;
        snap_lo.drives.push(d);

        let mut snap_hi = DriveSnapshot::default();
        let mut d = Drive::new("goals", 2.0, 0.0);
        d.pressure = hi;
        snap_hi.drives.push(d);

        let decision_lo = evaluate(&snap_lo, &idle_sensors(), &rules(), 0, None);
        let decision_hi = evaluate(&snap_hi, &idle_sensors(), &rules(), 0, None);

        if decision_lo.should_trigger {
            prop_assert!(decision_hi.should_trigger,
                "lo={} triggered ({}) but hi={} did not", lo, decision_lo.reason, hi);
        }
    }

    /// **Audit chain durability.** Any sequence of appended records chains
    /// correctly and survives a round-trip through `AuditLog::open`.
    #[test]
    fn arbitrary_append_sequences_chain_and_reopen_cleanly(
        kinds in prop::collection::vec("[a-z_]{3,10}", 1..15)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let log = AuditLog::open(dir.path(), clock.clone()).unwrap();
        for kind in &kinds {
            log.append(pulse_control::MutationRecord {
                ts: 0,
                kind: kind.clone(),
                target: "x".to_string(),
                before: serde_json::json!(0),
                after: serde_json::json!(1),
                reason: "proptest".to_string(),
                clamped: false,
                clamped_from: None,
                source: "property_test".to_string(),
                prev_hash: String::new(),
                hash: String::new(),
            }).unwrap();
        }

        let records = log.read_all().unwrap();
        prop_assert_eq!(records.len(), kinds.len());
        for i in 1..records.len() {
            prop_assert_eq!(&records[i].prev_hash, &records[i - 1].hash);
        }

        let reopened = AuditLog::open(dir.path(), clock).unwrap();
        prop_assert_eq!(reopened.current_hash(), log.current_hash());
    }
}
