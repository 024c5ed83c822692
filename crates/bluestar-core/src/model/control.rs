// ── Control domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use bluestar_api::models::{ControlPayload, ModeValue};

use super::device::DeviceState;

/// A sparse update for one device. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlIntent {
    pub power: Option<bool>,
    pub mode: Option<i64>,
    pub target_temp: Option<f64>,
    pub fan_speed: Option<i64>,
    pub vertical_swing: Option<i64>,
    pub horizontal_swing: Option<i64>,
    pub display: Option<bool>,
}

impl ControlIntent {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Flatten into the wire delta: present fields only, mode wrapped as
    /// `{value}`, target temperature as a one-decimal string, stamped
    /// with `ts` and the source marker.
    pub fn to_payload(&self, ts: i64) -> ControlPayload {
        let mut payload = ControlPayload::new(ts);
        payload.pow = self.power.map(u8::from);
        payload.mode = self.mode.map(|value| ModeValue { value });
        payload.stemp = self.target_temp.map(|t| format!("{t:.1}"));
        payload.fspd = self.fan_speed;
        payload.vswing = self.vertical_swing;
        payload.hswing = self.horizontal_swing;
        payload.display = self.display.map(u8::from);
        payload
    }
}

/// Which rung of the control ladder the call ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ControlMethod {
    BrokerPrimary,
    RestPreferences,
    RestState,
    /// Only a re-report was requested; the intent itself is unconfirmed.
    ForceResync,
    /// Every rung failed.
    Unconfirmed,
}

impl ControlMethod {
    /// `true` when a surface accepted the intent itself.
    pub fn confirms_intent(self) -> bool {
        matches!(
            self,
            Self::BrokerPrimary | Self::RestPreferences | Self::RestState
        )
    }
}

/// Result of `control_device` / `force_sync`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlOutcome {
    pub method: ControlMethod,
    pub confirmed: bool,
    /// Freshly fetched state, when the final re-fetch succeeded.
    pub state: Option<DeviceState>,
}

impl ControlOutcome {
    pub fn new(method: ControlMethod, state: Option<DeviceState>) -> Self {
        Self {
            method,
            confirmed: method.confirms_intent(),
            state,
        }
    }
}

/// Outcome of the most recent refresh, observable by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    #[default]
    Idle,
    Ok { at: DateTime<Utc> },
    Failed { message: String, at: DateTime<Utc> },
}

impl UpdateStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
