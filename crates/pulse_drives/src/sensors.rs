//! Sensors — one reading per tick's "sense" phase. Grounded on the dynamic
//! sensor pattern in `parietal_sensors.py` (`BaseSensor::read() -> dict`),
//! adapted to the fixed `SensorSnapshot` shape in spec.md §3: filesystem
//! changes, system alerts, and conversation activity.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub age_hours: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: AlertSeverity,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub active: bool,
    pub in_cooldown: bool,
    pub seconds_since: i64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            active: false,
            in_cooldown: false,
            seconds_since: i64::MAX,
        }
    }
}

/// A snapshot is immutable for the duration of a tick (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SensorSnapshot {
    pub filesystem: Vec<FileChange>,
    pub system: Vec<Alert>,
    pub conversation: ConversationState,
}

impl SensorSnapshot {
    pub fn has_critical_alert(&self) -> bool {
        self.system.iter().any(|a| a.severity == AlertSeverity::High)
    }
}

/// A single sensor's read. Each kind of sensor contributes a partial view;
/// the drive engine's "sense" phase merges them into one `SensorSnapshot`.
#[async_trait]
pub trait Sensor: Send + Sync {
    fn name(&self) -> &str;
    async fn read(&self) -> Result<serde_json::Value>;
}

/// Watches a set of paths for staleness (mirrors `ParietalFileSensor`'s
/// age-based health check, generalized across a fixed watch list rather
/// than runtime-discovered signals).
pub struct FilesystemSensor {
    watched: Vec<PathBuf>,
    stale_after_hours: f32,
}

impl FilesystemSensor {
    pub fn new(watched: Vec<PathBuf>, stale_after_hours: f32) -> Self {
        Self {
            watched,
            stale_after_hours,
        }
    }

    fn age_hours(path: &Path) -> Option<f32> {
        let metadata = std::fs::metadata(path).ok()?;
        let modified = metadata.modified().ok()?;
        let elapsed = SystemTime::now().duration_since(modified).ok()?;
        Some(elapsed.as_secs_f32() / 3600.0)
    }

    pub fn scan(&self) -> Vec<FileChange> {
        self.watched
            .iter()
            .filter_map(|p| {
                Self::age_hours(p).map(|age_hours| FileChange {
                    path: p.to_string_lossy().to_string(),
                    age_hours,
                })
            })
            .filter(|fc| fc.age_hours >= self.stale_after_hours)
            .collect()
    }
}

#[async_trait]
impl Sensor for FilesystemSensor {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn read(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.scan())?)
    }
}

/// Tracks whether a conversation is currently active and, if not, how long
/// since the last one ended (used by the evaluator's suppression rule,
/// spec.md §4.9).
pub struct ConversationSensor {
    last_activity_ts: std::sync::Mutex<Option<i64>>,
    cooldown_secs: i64,
}

impl ConversationSensor {
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            last_activity_ts: std::sync::Mutex::new(None),
            cooldown_secs,
        }
    }

    pub fn mark_active(&self) {
        *self.last_activity_ts.lock().expect("conversation sensor lock poisoned") =
            Some(Utc::now().timestamp());
    }

    pub fn snapshot(&self) -> ConversationState {
        let last = *self.last_activity_ts.lock().expect("conversation sensor lock poisoned");
        match last {
            None => ConversationState::default(),
            Some(ts) => {
                let seconds_since = Utc::now().timestamp() - ts;
                ConversationState {
                    active: seconds_since < 5,
                    in_cooldown: seconds_since < self.cooldown_secs,
                    seconds_since,
                }
            }
        }
    }
}

#[async_trait]
impl Sensor for ConversationSensor {
    fn name(&self) -> &str {
        "conversation"
    }

    async fn read(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.snapshot())?)
    }
}

/// System-level health alerts: disk space, token usage, provider latency.
/// Thresholds are supplied by the caller (Spine owns the canonical
/// percentage tables); this sensor's job is only to surface raw alerts.
pub struct SystemSensor {
    disk_path: PathBuf,
    low_disk_gb: f64,
}

impl SystemSensor {
    pub fn new(disk_path: impl Into<PathBuf>, low_disk_gb: f64) -> Self {
        Self {
            disk_path: disk_path.into(),
            low_disk_gb,
        }
    }

    pub fn scan(&self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        if let Some(free_gb) = disk_free_gb(&self.disk_path) {
            if free_gb < self.low_disk_gb {
                alerts.push(Alert {
                    kind: "disk_free".to_string(),
                    severity: AlertSeverity::High,
                    detail: format!("{free_gb:.2} GB free"),
                });
            }
        }
        alerts
    }
}

fn disk_free_gb(path: &Path) -> Option<f64> {
    fs2::available_space(path).ok().map(|bytes| bytes as f64 / 1_073_741_824.0)
}

#[async_trait]
impl Sensor for SystemSensor {
    fn name(&self) -> &str {
        "system"
    }

    async fn read(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.scan())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filesystem_sensor_flags_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("touched.txt");
        std::fs::write(&path, "x").unwrap();
        let sensor = FilesystemSensor::new(vec![path], 0.0);
        let changes = sensor.scan();
        assert_eq!(changes.len(), 1);
    }

    #[tokio::test]
    async fn conversation_sensor_defaults_to_inactive() {
        let sensor = ConversationSensor::new(60);
        let snapshot = sensor.snapshot();
        assert!(!snapshot.active);
        assert!(!snapshot.in_cooldown);
    }

    #[tokio::test]
    async fn conversation_sensor_reports_active_right_after_marking() {
        let sensor = ConversationSensor::new(60);
        sensor.mark_active();
        let snapshot = sensor.snapshot();
        assert!(snapshot.active);
        assert!(snapshot.in_cooldown);
    }

    #[test]
    fn snapshot_detects_critical_alert() {
        let snapshot = SensorSnapshot {
            filesystem: vec![],
            system: vec![Alert {
                kind: "disk_free".into(),
                severity: AlertSeverity::High,
                detail: "low".into(),
            }],
            conversation: ConversationState::default(),
        };
        assert!(snapshot.has_critical_alert());
    }
}
