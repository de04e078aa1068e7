//! Typed, TOML-backed configuration, following the same shape as the rest
//! of this family of daemons: every field has a sensible default via
//! `#[serde(default)]`, `load_or_default` never fails (it falls back to
//! defaults and logs), and a small set of environment variables can
//! override specific fields after the file is parsed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PulseConfig {
    #[serde(default)]
    pub pulse: PulseSection,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub openclaw: OpenclawConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub drives: Vec<DriveConfig>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            pulse: PulseSection::default(),
            workspace: WorkspaceConfig::default(),
            logging: LoggingConfig::default(),
            openclaw: OpenclawConfig::default(),
            evaluator: EvaluatorConfig::default(),
            daemon: DaemonConfig::default(),
            drives: DriveConfig::defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PulseSection {
    /// Root directory for all per-module state files. A parameter of the
    /// daemon instance so multiple instances can run in isolation.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for PulseSection {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs_home().join(".pulse").join("state")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
    #[serde(default = "default_daily_notes")]
    pub daily_notes: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            daily_notes: default_daily_notes(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    dirs_home().join(".openclaw").join("workspace")
}

fn default_daily_notes() -> PathBuf {
    default_workspace_root().join("daily")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Main,
    Isolated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenclawConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub webhook_token: Option<String>,
    #[serde(default)]
    pub session_mode: SessionMode,
    #[serde(default = "default_deliver")]
    pub deliver: String,
    #[serde(default)]
    pub isolated_model: Option<String>,
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,
}

impl Default for OpenclawConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            webhook_token: None,
            session_mode: SessionMode::default(),
            deliver: default_deliver(),
            isolated_model: None,
            message_prefix: default_message_prefix(),
        }
    }
}

fn default_deliver() -> String {
    "chat".to_string()
}

fn default_message_prefix() -> String {
    "[pulse]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub rules: EvaluatorRules,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            rules: EvaluatorRules::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorRules {
    #[serde(default = "default_single_drive_threshold")]
    pub single_drive_threshold: f32,
    #[serde(default = "default_combined_threshold")]
    pub combined_threshold: f32,
    #[serde(default = "default_true")]
    pub suppress_during_conversation: bool,
}

impl Default for EvaluatorRules {
    fn default() -> Self {
        Self {
            single_drive_threshold: default_single_drive_threshold(),
            combined_threshold: default_combined_threshold(),
            suppress_during_conversation: true,
        }
    }
}

fn default_single_drive_threshold() -> f32 {
    2.0
}

fn default_combined_threshold() -> f32 {
    6.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_maintain_every_ticks")]
    pub maintain_every_ticks: u64,
    #[serde(default = "default_webhook_timeout_seconds")]
    pub webhook_timeout_seconds: u64,
    #[serde(default = "default_shutdown_budget_seconds")]
    pub shutdown_budget_seconds: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            maintain_every_ticks: default_maintain_every_ticks(),
            webhook_timeout_seconds: default_webhook_timeout_seconds(),
            shutdown_budget_seconds: default_shutdown_budget_seconds(),
        }
    }
}

fn default_tick_seconds() -> u64 {
    5
}

fn default_maintain_every_ticks() -> u64 {
    12
}

fn default_webhook_timeout_seconds() -> u64 {
    10
}

fn default_shutdown_budget_seconds() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveConfig {
    pub name: String,
    #[serde(default = "default_drive_weight")]
    pub weight: f32,
    #[serde(default = "default_drive_rate")]
    pub rate: f32,
    #[serde(default)]
    pub decay: Option<f32>,
}

fn default_drive_weight() -> f32 {
    1.0
}

fn default_drive_rate() -> f32 {
    0.01
}

impl DriveConfig {
    /// The two protected drives, seeded so a fresh instance always starts
    /// with them present (§4 Guardrails: `goals` and `growth` may never be
    /// removed, so they must exist from the start).
    fn defaults() -> Vec<Self> {
        vec![
            DriveConfig {
                name: "goals".to_string(),
                weight: 1.0,
                rate: 0.01,
                decay: None,
            },
            DriveConfig {
                name: "growth".to_string(),
                weight: 1.0,
                rate: 0.01,
                decay: None,
            },
        ]
    }
}

impl PulseConfig {
    /// Parse a TOML file. Fails loudly: callers that want a forgiving
    /// startup should use `load_or_default`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let mut config: PulseConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse `path` if present; otherwise fall back to defaults. Never
    /// fails — a daemon should start even with a missing or broken config,
    /// degrading rather than aborting.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!(
                    "using default Pulse config ({}): {e}",
                    path.as_ref().display()
                );
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("PULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_protected_drives() {
        let config = PulseConfig::default();
        let names: Vec<_> = config.drives.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"goals"));
        assert!(names.contains(&"growth"));
    }

    #[test]
    fn minimal_toml_fills_in_defaults() {
        let toml_str = r#"
            [openclaw]
            webhook_url = "http://localhost:9000/webhook"
        "#;
        let config: PulseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.openclaw.webhook_url, "http://localhost:9000/webhook");
        assert_eq!(config.evaluator.rules.combined_threshold, 6.0);
        assert_eq!(config.daemon.tick_seconds, 5);
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let config = PulseConfig::load_or_default("/nonexistent/pulse.toml");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn env_override_wins_over_file_value() {
        std::env::set_var("PULSE_LOG_LEVEL", "trace");
        let mut config = PulseConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "trace");
        std::env::remove_var("PULSE_LOG_LEVEL");
    }

    #[test]
    fn full_toml_round_trips_custom_values() {
        let toml_str = r#"
            [pulse]
            state_dir = "/tmp/pulse-test-state"

            [evaluator.rules]
            single_drive_threshold = 3.5
            combined_threshold = 9.0
            suppress_during_conversation = false

            [[drives]]
            name = "goals"
            weight = 1.2
            rate = 0.02

            [[drives]]
            name = "growth"
            weight = 0.8
            rate = 0.015
        "#;
        let config: PulseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pulse.state_dir, PathBuf::from("/tmp/pulse-test-state"));
        assert_eq!(config.evaluator.rules.single_drive_threshold, 3.5);
        assert!(!config.evaluator.rules.suppress_during_conversation);
        assert_eq!(config.drives.len(), 2);
    }
}
