// Device endpoints: the directory listing and the three REST control surfaces.

use serde_json::Value;

use crate::auth::Session;
use crate::client::BluestarClient;
use crate::error::Error;
use crate::models::{ControlPayload, ForceFetch, PreferencesUpdate, ShadowUpdate, ThingsResponse};

impl BluestarClient {
    /// List every device on the account with its last reported state.
    ///
    /// `GET /things`
    pub async fn list_things(&self, session: &Session) -> Result<ThingsResponse, Error> {
        self.get(session, "things").await
    }

    /// Mode-scoped preference update.
    ///
    /// `POST /things/{id}/preferences`
    pub async fn update_preferences(
        &self,
        session: &Session,
        device_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<Value, Error> {
        self.post(session, &thing_path(device_id, "preferences"), update)
            .await
    }

    /// Desired-state update, the same shape the shadow topic takes.
    ///
    /// `POST /things/{id}/state`
    pub async fn update_state(
        &self,
        session: &Session,
        device_id: &str,
        update: &ShadowUpdate<ControlPayload>,
    ) -> Result<Value, Error> {
        self.post(session, &thing_path(device_id, "state"), update)
            .await
    }

    /// Ask the unit to re-report its full state over REST.
    ///
    /// `POST /things/{id}/control`
    pub async fn force_fetch(&self, session: &Session, device_id: &str) -> Result<Value, Error> {
        self.post(session, &thing_path(device_id, "control"), &ForceFetch::default())
            .await
    }
}

/// The id is one path segment; `/`, `?` and `#` in it must not leak.
fn thing_path(device_id: &str, leaf: &str) -> String {
    format!("things/{}/{leaf}", urlencoding::encode(device_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_pass_through() {
        assert_eq!(thing_path("ac-1_B.2", "state"), "things/ac-1_B.2/state");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(thing_path("a/b?c#d", "control"), "things/a%2Fb%3Fc%23d/control");
    }
}
