//! Circadian — wall-clock-derived mode, with expiring overrides.

use pulse_bus::ThalamusBus;
use pulse_core::registry::Capability;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Dawn,
    Daylight,
    Golden,
    Twilight,
    DeepNight,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Dawn => "dawn",
            Mode::Daylight => "daylight",
            Mode::Golden => "golden",
            Mode::Twilight => "twilight",
            Mode::DeepNight => "deep_night",
        }
    }

    fn parse(s: &str) -> Option<Mode> {
        match s {
            "dawn" => Some(Mode::Dawn),
            "daylight" => Some(Mode::Daylight),
            "golden" => Some(Mode::Golden),
            "twilight" => Some(Mode::Twilight),
            "deep_night" => Some(Mode::DeepNight),
            _ => None,
        }
    }

    /// Boundary table: DAWN [6,9), DAYLIGHT [9,17), GOLDEN [17,22),
    /// TWILIGHT [22,26) wrapping past midnight to 2, DEEP_NIGHT [2,6).
    fn for_hour(hour: u32) -> Mode {
        let h = hour % 24;
        let extended = if h < 2 { h + 24 } else { h };
        match extended {
            6..=8 => Mode::Dawn,
            9..=16 => Mode::Daylight,
            17..=21 => Mode::Golden,
            22..=25 => Mode::Twilight,
            _ => Mode::DeepNight,
        }
    }

    fn settings(self) -> Value {
        match self {
            Mode::Dawn => serde_json::json!({"retina_threshold": 0.3, "mood_modifiers": {"initiative": 0.1}, "prose_tone": "soft"}),
            Mode::Daylight => serde_json::json!({"retina_threshold": 0.7, "mood_modifiers": {}, "prose_tone": "direct"}),
            Mode::Golden => serde_json::json!({"retina_threshold": 0.5, "mood_modifiers": {"warmth": 0.1}, "prose_tone": "warm"}),
            Mode::Twilight => serde_json::json!({"retina_threshold": 0.3, "mood_modifiers": {"creativity": 0.1}, "prose_tone": "reflective"}),
            Mode::DeepNight => serde_json::json!({"retina_threshold": 0.1, "mood_modifiers": {"risk_aversion": 0.1}, "prose_tone": "terse"}),
        }
    }
}

struct Override {
    mode: Mode,
    expires_at_ms: i64,
}

struct CircadianState {
    last_effective: Option<Mode>,
    active_override: Option<Override>,
}

pub struct Circadian {
    state: Mutex<CircadianState>,
    bus: Arc<ThalamusBus>,
    clock: Arc<dyn Clock>,
}

impl Circadian {
    pub fn new(bus: Arc<ThalamusBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CircadianState {
                last_effective: None,
                active_override: None,
            }),
            bus,
            clock,
        }
    }

    fn natural_mode(&self) -> Mode {
        let secs = self.clock.now_secs();
        let hour = ((secs / 3600) % 24) as u32;
        Mode::for_hour(hour)
    }

    pub fn override_mode(&self, mode: &str, duration_hours: f32) -> Option<Mode> {
        let mode = Mode::parse(mode)?;
        let mut state = self.state.lock().expect("circadian lock poisoned");
        state.active_override = Some(Override {
            mode,
            expires_at_ms: self.clock.now_ms() + (duration_hours * 3_600_000.0) as i64,
        });
        drop(state);
        self.emit_if_changed(mode, true);
        Some(mode)
    }

    pub fn get_current_mode(&self) -> Mode {
        let now_ms = self.clock.now_ms();
        let mut state = self.state.lock().expect("circadian lock poisoned");
        if let Some(o) = &state.active_override {
            if now_ms >= o.expires_at_ms {
                state.active_override = None;
            }
        }
        let effective = match &state.active_override {
            Some(o) => o.mode,
            None => self.natural_mode(),
        };
        drop(state);
        self.emit_if_changed(effective, false);
        effective
    }

    fn emit_if_changed(&self, effective: Mode, is_override: bool) {
        let mut state = self.state.lock().expect("circadian lock poisoned");
        if state.last_effective == Some(effective) {
            return;
        }
        state.last_effective = Some(effective);
        drop(state);
        let mut data = effective.settings();
        data["override"] = serde_json::json!(is_override);
        data["mode"] = serde_json::json!(effective.as_str());
        let _ = self.bus.append("circadian", "mode_change", 0.2, data);
    }
}

impl Capability for Circadian {
    fn get_status(&self) -> Value {
        let mode = self.get_current_mode();
        let mut settings = mode.settings();
        settings["mode"] = serde_json::json!(mode.as_str());
        settings
    }

    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "mode" => Some(serde_json::json!(self.get_current_mode().as_str())),
            _ => None,
        }
    }
}
