//! Daemon loop — the eight-phase tick cycle of spec.md §4.14, driven by a
//! single `tokio::select!` loop (grounded on `mneme_reasoning::agent_loop`'s
//! tick/trigger select pattern) with `tokio::signal::ctrl_c()` handling for
//! graceful shutdown within a bounded budget.

use crate::audit::AuditLog;
use crate::evaluator;
use crate::mutation::{MutationCommand, MutationEngine, MutationEngineError, MutationOutcome};
use crate::webhook::WebhookClient;
use pulse_bus::PulseContext;
use pulse_core::config::PulseConfig;
use pulse_drives::drive::DriveEngine;
use pulse_drives::sensors::{Sensor, SensorSnapshot};
use pulse_modules::Hypothalamus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct DaemonState {
    pub drives: DriveEngine,
    pub last_trigger_ms: Option<i64>,
    pub turn_counter: u64,
}

impl Default for DaemonState {
    fn default() -> Self {
        Self {
            drives: DriveEngine::new(),
            last_trigger_ms: None,
            turn_counter: 0,
        }
    }
}

impl DaemonState {
    fn from_config(config: &PulseConfig) -> Self {
        let drives = DriveEngine::from_configs(
            config
                .drives
                .iter()
                .map(|d| (d.name.clone(), d.weight, d.rate, d.decay)),
        );
        Self {
            drives,
            last_trigger_ms: None,
            turn_counter: 0,
        }
    }
}

pub struct Daemon {
    ctx: PulseContext,
    config: Arc<PulseConfig>,
    sensors: Vec<Box<dyn Sensor>>,
    webhook: WebhookClient,
    state: Mutex<DaemonState>,
    mutation: MutationEngine,
    hypothalamus: Option<Arc<Hypothalamus>>,
}

impl Daemon {
    /// `hypothalamus` is the same instance registered under that name in
    /// `ctx.registry` (if the caller registered one) — passed separately
    /// because the maintain phase needs its typed `scan_drives` return
    /// value, not just the narrow `Capability` view other modules read.
    pub fn new(ctx: PulseContext, sensors: Vec<Box<dyn Sensor>>, hypothalamus: Option<Arc<Hypothalamus>>) -> anyhow::Result<Self> {
        let config = ctx.config.clone();
        let webhook = WebhookClient::new(config.openclaw.clone())?;
        let state = DaemonState::from_config(&config);
        let audit = AuditLog::open(&ctx.state_dir, ctx.clock.clone())?;
        let mutation = MutationEngine::new(audit, ctx.clock.clone());
        Ok(Self {
            ctx,
            config,
            sensors,
            webhook,
            state: Mutex::new(state),
            mutation,
            hypothalamus,
        })
    }

    /// Applies a mutation command against the live drive engine. This is
    /// the one runtime-reachable path to the mutation engine — callers
    /// outside a tick (e.g. `maintain`'s hypothalamus retirement sweep)
    /// go through here rather than touching `self.state` directly.
    pub async fn apply_mutation(&self, command: MutationCommand) -> Result<MutationOutcome, MutationEngineError> {
        let mut state = self.state.lock().await;
        let outcome = self.mutation.apply(&mut state.drives, command)?;
        if let MutationOutcome::Applied(ref record) = outcome {
            self.ctx.event_bus.publish(
                "mutation_applied",
                &serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
            );
        }
        Ok(outcome)
    }

    /// Runs the tick loop until a shutdown signal arrives. Completes the
    /// in-progress tick if it finishes within the configured shutdown
    /// budget; otherwise abandons any in-flight webhook call and persists
    /// state regardless (spec.md §5's cancellation policy).
    pub async fn run(&self) -> anyhow::Result<()> {
        let tick_period = Duration::from_secs(self.config.daemon.tick_seconds);
        let shutdown_budget = Duration::from_secs(self.config.daemon.shutdown_budget_seconds);
        let mut ticks_since_maintain: u64 = 0;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(tick_period) => {
                    ticks_since_maintain += 1;
                    let do_maintain = ticks_since_maintain >= self.config.daemon.maintain_every_ticks;
                    if do_maintain {
                        ticks_since_maintain = 0;
                    }
                    if let Err(e) = self.tick(do_maintain).await {
                        tracing::warn!(error = %e, "tick failed, continuing to next tick");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    let shutdown = self.shutdown();
                    match tokio::time::timeout(shutdown_budget, shutdown).await {
                        Ok(()) => tracing::info!("shutdown completed within budget"),
                        Err(_) => tracing::warn!("shutdown exceeded budget, exiting anyway"),
                    }
                    return Ok(());
                }
            }
        }
    }

    /// One full tick: pre-sense, sense, accumulate, evaluate, act, post,
    /// maintain (if due), checkpoint.
    async fn tick(&self, do_maintain: bool) -> anyhow::Result<()> {
        // (1) pre-sense — biometric ingestion happens inside modules that
        // opt in (currently only Soma); the registry lookup degrades to a
        // no-op if Soma is absent.
        if let Some(soma) = self.ctx.registry.get("soma") {
            let _ = soma.get_status();
        }

        // (2) sense — every sensor contributes a partial snapshot.
        let snapshot = self.collect_sensors().await;

        // (3) accumulate.
        let mut state = self.state.lock().await;
        state.drives.accumulate(self.config.daemon.tick_seconds as f32 / 3600.0);
        let drive_snapshot = state.drives.snapshot();

        // (4) evaluate.
        let decision = evaluator::evaluate(
            &drive_snapshot,
            &snapshot,
            &self.config.evaluator.rules,
            self.ctx.clock.now_ms(),
            state.last_trigger_ms,
        );

        // (5) act.
        if decision.should_trigger {
            let top_drive = decision.top_drive.clone().unwrap_or_default();
            let top_pressure = decision.top_drive_pressure_snapshot.unwrap_or(0.0);
            let sensor_context = decision.sensor_context.to_string();
            let payload = self.webhook.build_payload(&decision.reason, &top_drive, top_pressure, &sensor_context);
            let result = self.webhook.send(&payload).await;

            if result.success {
                state.drives.relieve(&top_drive);
                state.last_trigger_ms = Some(self.ctx.clock.now_ms());
                state.turn_counter += 1;
                self.ctx.event_bus.publish("trigger_success", &serde_json::json!({"reason": decision.reason}));
            } else {
                self.ctx.event_bus.publish("trigger_failure", &serde_json::json!({"error": result.error}));
            }

            let _ = self.ctx.bus.append("daemon", "trigger", 0.8, serde_json::to_value(&decision)?);
        }
        drop(state);

        // (6) post — post-trigger hooks (mood/energy/chronicle) would run
        // here via the registry; left to the integration layer that wires
        // modules into a running daemon instance.

        // (7) maintain.
        if do_maintain {
            self.maintain().await;
        }

        // (8) checkpoint.
        self.checkpoint().await?;

        Ok(())
    }

    async fn collect_sensors(&self) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::default();
        for sensor in &self.sensors {
            match sensor.read().await {
                Ok(value) => merge_sensor_reading(&mut snapshot, sensor.name(), value),
                Err(e) => tracing::warn!(sensor = sensor.name(), error = %e, "sensor read failed"),
            }
        }
        snapshot
    }

    async fn maintain(&self) {
        if let Some(nephron) = self.ctx.registry.get("nephron") {
            let _ = nephron.get_status();
        }

        // Hypothalamus scan: drives that reached the retirement floor are
        // actually removed from the live engine through the mutation
        // engine, so the scan has a real effect rather than only updating
        // hypothalamus's own shadow bookkeeping.
        if let Some(hypothalamus) = &self.hypothalamus {
            for name in hypothalamus.scan_drives() {
                match self
                    .apply_mutation(MutationCommand::DriveRemove {
                        name: name.clone(),
                        reason: "hypothalamus_retirement".to_string(),
                    })
                    .await
                {
                    Ok(MutationOutcome::Blocked { error }) => {
                        tracing::warn!(drive = %name, error, "hypothalamus retirement mutation blocked");
                    }
                    Ok(MutationOutcome::Applied(_)) => {}
                    Err(e) => tracing::warn!(drive = %name, error = %e, "hypothalamus retirement mutation failed"),
                }
            }
        }

        for name in ["myelin", "telomere", "cerebellum", "aura"] {
            if let Some(capability) = self.ctx.registry.get(name) {
                let _ = capability.get_status();
            }
        }
    }

    async fn checkpoint(&self) -> anyhow::Result<()> {
        let state = self.state.lock().await;
        let path = self.ctx.module_state_path("pulse-state");
        pulse_drives::persistence::save(
            &path,
            &serde_json::json!({
                "turn": state.turn_counter,
                "last_trigger_ts": state.last_trigger_ms,
            }),
        )?;
        Ok(())
    }

    async fn shutdown(&self) {
        if let Err(e) = self.checkpoint().await {
            tracing::warn!(error = %e, "checkpoint failed during shutdown");
        }
    }
}

fn merge_sensor_reading(snapshot: &mut SensorSnapshot, name: &str, value: serde_json::Value) {
    match name {
        "filesystem" => {
            if let Ok(changes) = serde_json::from_value(value) {
                snapshot.filesystem = changes;
            }
        }
        "system" => {
            if let Ok(alerts) = serde_json::from_value(value) {
                snapshot.system = alerts;
            }
        }
        "conversation" => {
            if let Ok(state) = serde_json::from_value(value) {
                snapshot.conversation = state;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{SystemClock, TestClock};

    #[tokio::test]
    async fn single_tick_checkpoints_without_a_webhook_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PulseConfig::default();
        config.pulse.state_dir = dir.path().to_path_buf();
        let ctx = PulseContext::with_clock(config, Arc::new(SystemClock)).unwrap();
        let daemon = Daemon::new(ctx.clone(), vec![], None).unwrap();
        daemon.tick(false).await.unwrap();
        assert!(dir.path().join("pulse-state.json").exists());
    }

    #[tokio::test]
    async fn daemon_seeds_drives_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PulseConfig::default();
        config.pulse.state_dir = dir.path().to_path_buf();
        config.drives.push(pulse_core::config::DriveConfig {
            name: "curiosity".to_string(),
            weight: 1.7,
            rate: 0.03,
            decay: None,
        });
        let ctx = PulseContext::with_clock(config, Arc::new(SystemClock)).unwrap();
        let daemon = Daemon::new(ctx, vec![], None).unwrap();
        let state = daemon.state.lock().await;
        assert_eq!(state.drives.get("curiosity").unwrap().weight, 1.7);
        assert!(state.drives.contains("goals"));
    }

    #[tokio::test]
    async fn hypothalamus_retirement_removes_the_drive_through_the_mutation_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PulseConfig::default();
        config.pulse.state_dir = dir.path().to_path_buf();
        let clock = Arc::new(TestClock::new(0));
        let ctx = PulseContext::with_clock(config, clock.clone() as Arc<dyn pulse_core::Clock>).unwrap();
        let bus = ctx.bus.clone();
        let hypothalamus = Arc::new(Hypothalamus::new(bus, clock.clone() as Arc<dyn pulse_core::Clock>, |_| false));

        // Birth a drive, then decay it toward retirement one scan per
        // simulated day: weight reaches the floor around day 96 and stays
        // there for the 30-day floor duration, retiring on day 126 (see
        // hypothalamus.rs's own `drive_retires_after_floor_duration` test
        // for the same arithmetic). Run all but the last scan directly so
        // the final, retiring scan happens through `Daemon::maintain`.
        hypothalamus.on_need_signal("curiosity", "soma");
        hypothalamus.on_need_signal("curiosity", "dendrite");
        hypothalamus.on_need_signal("curiosity", "limbic");
        for _ in 0..125 {
            clock.advance_ms(24 * 60 * 60 * 1000);
            hypothalamus.scan_drives();
        }

        let daemon = Daemon::new(ctx, vec![], Some(hypothalamus)).unwrap();
        {
            let mut state = daemon.state.lock().await;
            state.drives.add_drive(pulse_drives::drive::Drive::new("curiosity", 0.1, 0.01)).ok();
        }
        clock.advance_ms(24 * 60 * 60 * 1000);
        daemon.maintain().await;
        let state = daemon.state.lock().await;
        assert!(!state.drives.contains("curiosity"));
    }

    #[test]
    fn merge_sensor_reading_updates_the_matching_field() {
        let mut snapshot = SensorSnapshot::default();
        merge_sensor_reading(
            &mut snapshot,
            "conversation",
            serde_json::json!({"active": true, "in_cooldown": false, "seconds_since": 0}),
        );
        assert!(snapshot.conversation.active);
    }
}
