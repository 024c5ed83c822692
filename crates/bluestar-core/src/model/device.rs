// ── Device domain types ──

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::control::ControlIntent;

/// One air conditioner on the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    /// User-assigned name, `"AC"` when unset.
    pub name: String,
    /// The vendor descriptor, untouched.
    pub raw: serde_json::Value,
}

/// Normalized device state. Every field is always populated; gaps in the
/// vendor report are filled with fixed defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub power: bool,
    /// Vendor mode code (2 = cool).
    pub mode: i64,
    /// Target temperature in °C.
    pub target_temp: f64,
    /// Room temperature in °C.
    pub current_temp: f64,
    pub fan_speed: i64,
    pub vertical_swing: i64,
    pub horizontal_swing: i64,
    pub display: bool,
    pub connected: bool,
    pub rssi: i64,
    pub error_code: i64,
    /// Which surface produced the last report.
    pub source: String,
    /// Milliseconds since the Unix epoch. Server time after a poll, local
    /// time after an optimistic patch.
    pub timestamp: i64,
}

impl DeviceState {
    /// Optimistically apply an intent, stamping `now_ms`.
    ///
    /// The next poll overwrites this with whatever the server reports.
    pub fn apply(&mut self, intent: &ControlIntent, now_ms: i64) {
        if let Some(power) = intent.power {
            self.power = power;
        }
        if let Some(mode) = intent.mode {
            self.mode = mode;
        }
        if let Some(temp) = intent.target_temp {
            self.target_temp = temp;
        }
        if let Some(fan) = intent.fan_speed {
            self.fan_speed = fan;
        }
        if let Some(v) = intent.vertical_swing {
            self.vertical_swing = v;
        }
        if let Some(h) = intent.horizontal_swing {
            self.horizontal_swing = h;
        }
        if let Some(display) = intent.display {
            self.display = display;
        }
        self.timestamp = now_ms;
    }
}

/// Everything known about the account after one directory fetch.
///
/// Replaced wholesale on every poll; `states` is keyed by device id and
/// only holds devices the backend reported state for.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub devices: IndexMap<String, Device>,
    pub states: IndexMap<String, DeviceState>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn state(&self, id: &str) -> Option<&DeviceState> {
        self.states.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DeviceState {
        DeviceState {
            power: false,
            mode: 2,
            target_temp: 24.0,
            current_temp: 27.5,
            fan_speed: 2,
            vertical_swing: 0,
            horizontal_swing: 0,
            display: false,
            connected: true,
            rssi: -45,
            error_code: 0,
            source: "unknown".into(),
            timestamp: 100,
        }
    }

    #[test]
    fn apply_touches_only_present_fields() {
        let mut s = state();
        let intent = ControlIntent {
            power: Some(true),
            target_temp: Some(21.5),
            ..ControlIntent::default()
        };
        s.apply(&intent, 5_000);

        assert!(s.power);
        assert!((s.target_temp - 21.5).abs() < f64::EPSILON);
        assert_eq!(s.mode, 2);
        assert_eq!(s.fan_speed, 2);
        assert_eq!(s.timestamp, 5_000);
    }
}
