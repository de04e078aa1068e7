//! Read-only access to `biosensor-state.json`, written by an external
//! bridge process. Freshness contract per spec.md §5/§6: a snapshot whose
//! `last_update` is older than `MAX_AGE_SECS` is treated as missing; prefer
//! per-field `ts` over the file-level timestamp when one is present. An
//! in-process cache bounds re-reads to once per `LOCAL_TTL_SECS`.

use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const MAX_AGE_SECS: i64 = 300;
const LOCAL_TTL_SECS: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FieldReading {
    pub value: Option<f64>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub stress_level: Option<String>,
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivityReading {
    #[serde(default)]
    pub r#move: Option<f64>,
    #[serde(default)]
    pub exercise: Option<f64>,
    #[serde(default)]
    pub stand: Option<f64>,
    #[serde(default)]
    pub goal_move: Option<f64>,
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SleepReading {
    pub stage: Option<String>,
    #[serde(default)]
    pub minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkoutReading {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub activity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BiosensorSnapshot {
    pub last_update: i64,
    #[serde(default)]
    pub heart_rate: Option<FieldReading>,
    #[serde(default)]
    pub hrv: Option<FieldReading>,
    #[serde(default)]
    pub activity: Option<ActivityReading>,
    #[serde(default)]
    pub sleep: Option<SleepReading>,
    #[serde(default)]
    pub workout: Option<WorkoutReading>,
}

struct CacheEntry {
    data: Option<BiosensorSnapshot>,
    read_at: i64,
}

pub struct BiosensorCache {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    max_age_secs: i64,
    cache: Mutex<CacheEntry>,
}

impl BiosensorCache {
    pub fn new(state_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self::with_max_age(state_dir, clock, MAX_AGE_SECS)
    }

    pub fn with_max_age(state_dir: impl AsRef<Path>, clock: Arc<dyn Clock>, max_age_secs: i64) -> Self {
        Self {
            path: state_dir.as_ref().join("biosensor-state.json"),
            clock,
            max_age_secs,
            cache: Mutex::new(CacheEntry {
                data: None,
                read_at: i64::MIN,
            }),
        }
    }

    /// Returns the current snapshot, or `None` if the bridge file is
    /// missing, unparseable, or stale. Re-reads the file at most once per
    /// `LOCAL_TTL_SECS`.
    pub fn read(&self) -> Option<BiosensorSnapshot> {
        let now = self.clock.now_secs();
        let mut entry = self.cache.lock().expect("biosensor cache lock poisoned");
        if now - entry.read_at > LOCAL_TTL_SECS {
            entry.data = self.read_file(now);
            entry.read_at = now;
        }
        entry.data.clone()
    }

    fn read_file(&self, now: i64) -> Option<BiosensorSnapshot> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let snapshot: BiosensorSnapshot = serde_json::from_str(&contents).ok()?;
        if now - snapshot.last_update > self.max_age_secs {
            return None;
        }
        Some(snapshot)
    }

    pub fn is_active(&self) -> bool {
        self.read().is_some()
    }

    fn field_fresh(&self, ts: Option<i64>) -> bool {
        match ts {
            Some(ts) => self.clock.now_secs() - ts <= self.max_age_secs,
            None => true,
        }
    }

    pub fn heart_rate(&self) -> Option<f64> {
        let hr = self.read()?.heart_rate?;
        self.field_fresh(hr.ts).then_some(hr.value).flatten()
    }

    pub fn hr_zone(&self) -> Option<String> {
        let hr = self.read()?.heart_rate?;
        self.field_fresh(hr.ts).then_some(hr.zone).flatten()
    }

    pub fn hrv(&self) -> Option<f64> {
        let hrv = self.read()?.hrv?;
        self.field_fresh(hrv.ts).then_some(hrv.value).flatten()
    }

    pub fn hrv_stress(&self) -> Option<String> {
        let hrv = self.read()?.hrv?;
        self.field_fresh(hrv.ts).then_some(hrv.stress_level).flatten()
    }

    pub fn move_ring_pct(&self) -> Option<f64> {
        let act = self.read()?.activity?;
        if !self.field_fresh(act.ts) {
            return None;
        }
        let goal = act.goal_move.unwrap_or(0.0);
        if goal <= 0.0 {
            return None;
        }
        Some((act.r#move.unwrap_or(0.0) / goal).min(1.0))
    }

    pub fn sleep(&self) -> Option<SleepReading> {
        let sleep = self.read()?.sleep?;
        sleep.stage.is_some().then_some(sleep)
    }

    pub fn workout(&self) -> Option<WorkoutReading> {
        let workout = self.read()?.workout?;
        workout.active.then_some(workout)
    }

    /// Forces the next `read()` to re-read the file, bypassing the TTL.
    pub fn invalidate(&self) {
        let mut entry = self.cache.lock().expect("biosensor cache lock poisoned");
        entry.data = None;
        entry.read_at = i64::MIN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::TestClock;

    fn write_state(dir: &Path, last_update: i64, hr_ts: i64) {
        let body = serde_json::json!({
            "last_update": last_update,
            "heart_rate": {"value": 72.0, "zone": "resting", "ts": hr_ts},
            "hrv": {"value": 55.0, "stress_level": "low", "ts": hr_ts},
        });
        std::fs::write(dir.join("biosensor-state.json"), body.to_string()).unwrap();
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(TestClock::new(0));
        let cache = BiosensorCache::new(dir.path(), clock);
        assert!(cache.read().is_none());
    }

    #[test]
    fn stale_file_level_timestamp_is_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(TestClock::new(10_000));
        write_state(dir.path(), 10_000 - MAX_AGE_SECS - 1, 10_000 - MAX_AGE_SECS - 1);
        let cache = BiosensorCache::new(dir.path(), clock);
        assert!(cache.read().is_none());
    }

    #[test]
    fn fresh_file_exposes_heart_rate() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(TestClock::new(10_000));
        write_state(dir.path(), 10_000, 10_000);
        let cache = BiosensorCache::new(dir.path(), clock);
        assert_eq!(cache.heart_rate(), Some(72.0));
        assert_eq!(cache.hr_zone(), Some("resting".to_string()));
    }

    #[test]
    fn per_field_staleness_overrides_fresh_file_level_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(TestClock::new(10_000));
        // File-level timestamp is fresh but the heart-rate field's own ts is stale.
        write_state(dir.path(), 10_000, 10_000 - MAX_AGE_SECS - 1);
        let cache = BiosensorCache::new(dir.path(), clock);
        assert_eq!(cache.heart_rate(), None);
    }
}
