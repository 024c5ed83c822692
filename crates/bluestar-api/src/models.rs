// Wire models for the Bluestar cloud API.
//
// Incoming shapes are deliberately lenient: the backend omits fields for
// devices that never reported them, and some fields arrive in more than
// one shape. Outgoing shapes are exact.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Source marker stamped on every control delta (`src`).
pub const SOURCE_MARKER: &str = "anmq";

/// Key of the one-field force-fetch payload.
pub const FORCE_FETCH_KEY: &str = "fpsh";

// ── Login ───────────────────────────────────────────────────────────

/// `POST /auth/login` body. `auth_type` must be the number `1`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub auth_id: &'a str,
    pub auth_type: u8,
    pub password: &'a str,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    /// Bearer session token.
    #[serde(default)]
    pub session: Option<String>,
    /// Base64-packed broker credentials (`endpoint::access::secret`).
    #[serde(default)]
    pub mi: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginUser {
    /// Sometimes numeric, sometimes a string.
    #[serde(default)]
    pub id: Option<Value>,
}

impl LoginResponse {
    /// The user id as a string, whatever JSON type the backend used.
    pub fn user_id(&self) -> Option<String> {
        match self.user.as_ref()?.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ── Things (device list) ────────────────────────────────────────────

/// `GET /things` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThingsResponse {
    #[serde(default)]
    pub things: Vec<Thing>,
    #[serde(default)]
    pub states: HashMap<String, ThingState>,
}

/// A device descriptor. Everything beyond the id and user config is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub thing_id: String,
    #[serde(default)]
    pub user_config: UserConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Last reported state of one device, keyed by thing id in [`ThingsResponse`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThingState {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub state: ReportedState,
    #[serde(default, deserialize_with = "lenient")]
    pub connected: Option<bool>,
    /// Server-side report time in milliseconds.
    #[serde(default, deserialize_with = "lenient_int")]
    pub timestamp: Option<i64>,
}

/// The reported-state blob. Every field may be missing, and a field in a
/// shape we cannot read counts as missing rather than failing the listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportedState {
    #[serde(default, deserialize_with = "lenient_int")]
    pub pow: Option<i64>,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: Option<ModeField>,
    #[serde(default, deserialize_with = "lenient")]
    pub stemp: Option<Temperature>,
    #[serde(default, deserialize_with = "lenient")]
    pub ctemp: Option<Temperature>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub fspd: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub vswing: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub hswing: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub display: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub rssi: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub err: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub src: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any value `T` cannot be read from becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Integers as devices actually send them: `3`, `3.0`, `"3"` or `true`.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(int_from_value(&value))
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<Option<ModeField>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let code = match &value {
        Value::Object(map) => map.get("value").and_then(int_from_value),
        other => int_from_value(other),
    };
    Ok(code.map(ModeField::Scalar))
}

#[allow(clippy::cast_possible_truncation)]
fn int_from_value(value: &Value) -> Option<i64> {
    let whole = |f: f64| f.is_finite().then(|| f.round() as i64);
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| s.parse().ok().and_then(whole))
        }
        _ => None,
    }
}

/// The mode field arrives either bare (`2`) or wrapped (`{"value": 2}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeField {
    Scalar(i64),
    Wrapped { value: i64 },
}

impl ModeField {
    /// The numeric mode code, regardless of shape.
    pub fn code(self) -> i64 {
        match self {
            Self::Scalar(code) | Self::Wrapped { value: code } => code,
        }
    }
}

/// Temperatures arrive as JSON numbers or as numeric strings (`"24"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Temperature {
    Number(f64),
    Text(String),
}

impl Temperature {
    /// Degrees Celsius, or `None` if a string value does not parse.
    pub fn celsius(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

// ── Control payloads ────────────────────────────────────────────────

/// Wrapped mode value as the control surfaces expect it: `{"value": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeValue {
    pub value: i64,
}

/// The flat control delta sent to every control surface.
///
/// Only the fields present in the intent are serialized; `ts` and `src`
/// are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pow: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stemp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fspd: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vswing: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hswing: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<u8>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub src: String,
}

impl ControlPayload {
    /// An empty delta stamped with `ts` and the source marker.
    pub fn new(ts: i64) -> Self {
        Self {
            pow: None,
            mode: None,
            stemp: None,
            fspd: None,
            vswing: None,
            hswing: None,
            display: None,
            ts,
            src: SOURCE_MARKER.to_owned(),
        }
    }

    /// The mode code being set, if any.
    pub fn mode_code(&self) -> Option<i64> {
        self.mode.map(|m| m.value)
    }

    /// Intent fields as stringified preference leaves, bookkeeping excluded.
    pub fn preference_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                fields.insert(key.to_owned(), v);
            }
        };
        put("power", self.pow.map(|v| v.to_string()));
        put("mode", self.mode.map(|m| m.value.to_string()));
        put("stemp", self.stemp.clone());
        put("fspd", self.fspd.map(|v| v.to_string()));
        put("vswing", self.vswing.map(|v| v.to_string()));
        put("hswing", self.hswing.map(|v| v.to_string()));
        put("display", self.display.map(|v| v.to_string()));
        fields
    }
}

/// `{"state": {"desired": ...}}`, used by the shadow topic and `/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowUpdate<T> {
    pub state: Desired<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desired<T> {
    pub desired: T,
}

impl<T> ShadowUpdate<T> {
    pub fn desired(delta: T) -> Self {
        Self {
            state: Desired { desired: delta },
        }
    }
}

/// `{"preferences": {"mode": {"<mode>": {"<field>": "<value>"}}}}`.
///
/// The preferences endpoint is keyed by the active mode, and every leaf
/// must be a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub preferences: ModePreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModePreferences {
    pub mode: BTreeMap<String, BTreeMap<String, String>>,
}

impl PreferencesUpdate {
    /// Scope the payload's intent fields under `effective_mode`.
    pub fn for_mode(effective_mode: i64, payload: &ControlPayload) -> Self {
        let mut mode = BTreeMap::new();
        mode.insert(effective_mode.to_string(), payload.preference_fields());
        Self {
            preferences: ModePreferences { mode },
        }
    }

    /// The single mode key this update is scoped to.
    pub fn mode_key(&self) -> Option<&str> {
        self.preferences.mode.keys().next().map(String::as_str)
    }
}

/// `{"fpsh": 1}` -- asks the unit to re-report its full state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceFetch {
    #[serde(rename = "fpsh")]
    pub force_fetch: u8,
}

impl Default for ForceFetch {
    fn default() -> Self {
        Self { force_fetch: 1 }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn mode_field_accepts_both_shapes() {
        let bare: ModeField = serde_json::from_value(json!(3)).unwrap();
        let wrapped: ModeField = serde_json::from_value(json!({ "value": 4 })).unwrap();
        assert_eq!(bare.code(), 3);
        assert_eq!(wrapped.code(), 4);
    }

    #[test]
    fn temperature_accepts_strings_and_numbers() {
        let text: Temperature = serde_json::from_value(json!("24.5")).unwrap();
        let num: Temperature = serde_json::from_value(json!(27)).unwrap();
        assert_eq!(text.celsius(), Some(24.5));
        assert_eq!(num.celsius(), Some(27.0));
        assert_eq!(Temperature::Text("n/a".into()).celsius(), None);
    }

    #[test]
    fn things_response_tolerates_missing_fields() {
        let body = json!({
            "things": [{ "thing_id": "ac-1", "model": "X" }],
            "states": { "ac-1": { "state": { "mode": { "value": 0 } } } }
        });
        let parsed: ThingsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.things[0].thing_id, "ac-1");
        assert_eq!(parsed.things[0].user_config.name, None);
        assert_eq!(parsed.things[0].extra["model"], "X");
        let state = &parsed.states["ac-1"];
        assert_eq!(state.state.mode.map(ModeField::code), Some(0));
        assert_eq!(state.connected, None);
        assert_eq!(state.state.pow, None);
    }

    #[test]
    fn loosely_typed_fields_are_coerced_or_dropped() {
        let body = json!({
            "things": [{ "thing_id": "ac-1" }, { "thing_id": "ac-2" }],
            "states": {
                "ac-1": { "state": { "pow": 1 } },
                "ac-2": {
                    "state": {
                        "pow": true, "fspd": "3", "rssi": -45.0, "mode": "4",
                        "err": [1], "stemp": false, "src": 7
                    },
                    "connected": "yes",
                    "timestamp": "1700000000000"
                }
            }
        });
        let parsed: ThingsResponse = serde_json::from_value(body).unwrap();
        let ac2 = &parsed.states["ac-2"];
        assert_eq!(ac2.state.pow, Some(1));
        assert_eq!(ac2.state.fspd, Some(3));
        assert_eq!(ac2.state.rssi, Some(-45));
        assert_eq!(ac2.state.mode.map(ModeField::code), Some(4));
        assert_eq!(ac2.state.err, None);
        assert_eq!(ac2.state.stemp, None);
        assert_eq!(ac2.state.src, None);
        assert_eq!(ac2.connected, None);
        assert_eq!(ac2.timestamp, Some(1_700_000_000_000));
        assert_eq!(parsed.states["ac-1"].state.pow, Some(1));
    }

    #[test]
    fn non_object_state_reads_as_empty() {
        let state: ThingState = serde_json::from_value(json!({ "state": null })).unwrap();
        assert_eq!(state.state.pow, None);
        assert_eq!(state.state.mode, None);
    }

    #[test]
    fn control_payload_serializes_only_present_fields() {
        let mut payload = ControlPayload::new(1_700_000_000_000);
        payload.pow = Some(1);
        payload.mode = Some(ModeValue { value: 2 });
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({ "pow": 1, "mode": { "value": 2 }, "ts": 1_700_000_000_000_i64, "src": "anmq" })
        );
    }

    #[test]
    fn preferences_stringify_every_leaf() {
        let mut payload = ControlPayload::new(1);
        payload.pow = Some(1);
        payload.fspd = Some(4);
        payload.stemp = Some("22.5".into());
        let update = PreferencesUpdate::for_mode(3, &payload);
        assert_eq!(update.mode_key(), Some("3"));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "preferences": { "mode": { "3": {
                "power": "1", "fspd": "4", "stemp": "22.5"
            } } } })
        );
    }

    #[test]
    fn force_fetch_is_one_key() {
        assert_eq!(serde_json::to_value(ForceFetch::default()).unwrap(), json!({ "fpsh": 1 }));
    }

    #[test]
    fn user_id_handles_numeric_ids() {
        let resp: LoginResponse =
            serde_json::from_value(json!({ "session": "t", "user": { "id": 42 } })).unwrap();
        assert_eq!(resp.user_id().as_deref(), Some("42"));
    }
}
