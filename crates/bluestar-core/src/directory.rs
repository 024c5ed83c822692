// ── Device directory ──
//
// One authenticated `GET /things` per fetch, normalized into a `Snapshot`.
// The backend omits fields a device never reported; the defaults below
// fill those gaps and must stay fixed so consumers see stable values.

use chrono::Utc;
use indexmap::IndexMap;
use tracing::debug;

use bluestar_api::models::{ModeField, Temperature, Thing, ThingState, ThingsResponse};

use crate::error::CoreError;
use crate::model::{Device, DeviceState, Snapshot};
use crate::session::SessionManager;

pub const DEFAULT_NAME: &str = "AC";
/// Cool.
pub const DEFAULT_MODE: i64 = 2;
pub const DEFAULT_TARGET_TEMP: f64 = 24.0;
pub const DEFAULT_CURRENT_TEMP: f64 = 27.5;
pub const DEFAULT_FAN_SPEED: i64 = 2;
pub const DEFAULT_RSSI: i64 = -45;
pub const DEFAULT_SOURCE: &str = "unknown";

/// Fetch every device and its normalized state.
pub async fn fetch_all(sessions: &SessionManager) -> Result<Snapshot, CoreError> {
    let things = sessions
        .call(|client, session| async move { client.list_things(&session).await })
        .await?;

    let snapshot = normalize(things);
    debug!(
        devices = snapshot.devices.len(),
        states = snapshot.states.len(),
        "directory fetched"
    );
    Ok(snapshot)
}

/// Turn a raw listing into a snapshot, preserving the backend's order.
///
/// Every listed device gets a state; one that never reported gets the
/// defaults. States for unlisted ids are dropped.
pub fn normalize(response: ThingsResponse) -> Snapshot {
    let ThingsResponse { things, mut states } = response;

    let mut devices = IndexMap::with_capacity(things.len());
    let mut normalized = IndexMap::with_capacity(things.len());

    for thing in things {
        let raw = states.remove(&thing.thing_id).unwrap_or_default();
        normalized.insert(thing.thing_id.clone(), normalize_state(&raw));
        let device = normalize_device(thing);
        devices.insert(device.id.clone(), device);
    }

    Snapshot {
        devices,
        states: normalized,
        fetched_at: Some(Utc::now()),
    }
}

pub fn normalize_device(thing: Thing) -> Device {
    let name = thing
        .user_config
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_owned());
    let id = thing.thing_id.clone();
    let raw = serde_json::to_value(&thing).unwrap_or_default();
    Device { id, name, raw }
}

/// Fill every gap in a reported-state blob with the fixed defaults.
pub fn normalize_state(raw: &ThingState) -> DeviceState {
    let reported = &raw.state;
    DeviceState {
        power: reported.pow == Some(1),
        mode: reported.mode.map_or(DEFAULT_MODE, ModeField::code),
        target_temp: celsius_or(reported.stemp.as_ref(), DEFAULT_TARGET_TEMP),
        current_temp: celsius_or(reported.ctemp.as_ref(), DEFAULT_CURRENT_TEMP),
        fan_speed: reported.fspd.unwrap_or(DEFAULT_FAN_SPEED),
        vertical_swing: reported.vswing.unwrap_or(0),
        horizontal_swing: reported.hswing.unwrap_or(0),
        display: reported.display.is_some_and(|d| d != 0),
        connected: raw.connected.unwrap_or(false),
        rssi: reported.rssi.unwrap_or(DEFAULT_RSSI),
        error_code: reported.err.unwrap_or(0),
        source: reported
            .src
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE.to_owned()),
        timestamp: raw.timestamp.unwrap_or(0),
    }
}

fn celsius_or(value: Option<&Temperature>, default: f64) -> f64 {
    value.and_then(Temperature::celsius).unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn state_from(value: serde_json::Value) -> DeviceState {
        normalize_state(&serde_json::from_value(value).unwrap())
    }

    #[test]
    fn empty_report_gets_every_default() {
        let state = state_from(json!({}));
        assert_eq!(
            state,
            DeviceState {
                power: false,
                mode: 2,
                target_temp: 24.0,
                current_temp: 27.5,
                fan_speed: 2,
                vertical_swing: 0,
                horizontal_swing: 0,
                display: false,
                connected: false,
                rssi: -45,
                error_code: 0,
                source: "unknown".into(),
                timestamp: 0,
            }
        );
    }

    #[test]
    fn reported_values_win() {
        let state = state_from(json!({
            "state": {
                "pow": 1, "mode": { "value": 4 }, "stemp": "26.5", "ctemp": 30,
                "fspd": 5, "vswing": 1, "hswing": 2, "display": 1,
                "rssi": -60, "err": 3, "src": "mqtt"
            },
            "connected": true,
            "timestamp": 1_700_000_000_000_i64
        }));
        assert!(state.power);
        assert_eq!(state.mode, 4);
        assert!((state.target_temp - 26.5).abs() < f64::EPSILON);
        assert!((state.current_temp - 30.0).abs() < f64::EPSILON);
        assert_eq!(state.fan_speed, 5);
        assert!(state.display);
        assert!(state.connected);
        assert_eq!(state.rssi, -60);
        assert_eq!(state.error_code, 3);
        assert_eq!(state.source, "mqtt");
        assert_eq!(state.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn power_is_on_only_for_one() {
        assert!(!state_from(json!({ "state": { "pow": 0 } })).power);
        assert!(!state_from(json!({ "state": { "pow": 2 } })).power);
    }

    #[test]
    fn unparseable_temperature_falls_back() {
        let state = state_from(json!({ "state": { "stemp": "--" } }));
        assert!((state.target_temp - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn normalize_keeps_order_and_names() {
        let response: ThingsResponse = serde_json::from_value(json!({
            "things": [
                { "thing_id": "b", "user_config": { "name": "Hall" } },
                { "thing_id": "a" }
            ],
            "states": { "a": { "state": { "pow": 1 } } }
        }))
        .unwrap();

        let snapshot = normalize(response);
        let ids: Vec<&str> = snapshot.devices.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(snapshot.device("b").unwrap().name, "Hall");
        assert_eq!(snapshot.device("a").unwrap().name, "AC");
        assert!(snapshot.state("a").unwrap().power);
        assert_eq!(snapshot.device("a").unwrap().raw["thing_id"], "a");
    }

    #[test]
    fn unreported_device_gets_default_state() {
        let response: ThingsResponse = serde_json::from_value(json!({
            "things": [{ "thing_id": "ac-1" }, { "thing_id": "ac-2" }],
            "states": { "ac-2": { "state": { "pow": 1 } }, "stray": { "state": {} } }
        }))
        .unwrap();

        let snapshot = normalize(response);
        assert_eq!(snapshot.states.len(), 2);
        assert_eq!(snapshot.state("ac-1"), Some(&state_from(json!({}))));
        assert_eq!(snapshot.state("ac-1").unwrap().source, "unknown");
        assert!(snapshot.state("stray").is_none());
    }

    #[test]
    fn string_fan_speed_does_not_sink_the_listing() {
        let response: ThingsResponse = serde_json::from_value(json!({
            "things": [{ "thing_id": "ac-1" }, { "thing_id": "ac-2" }],
            "states": {
                "ac-1": { "state": { "pow": 1 } },
                "ac-2": { "state": { "fspd": "3", "rssi": -50.0 } }
            }
        }))
        .unwrap();

        let snapshot = normalize(response);
        assert!(snapshot.state("ac-1").unwrap().power);
        assert_eq!(snapshot.state("ac-2").unwrap().fan_speed, 3);
        assert_eq!(snapshot.state("ac-2").unwrap().rssi, -50);
    }
}
