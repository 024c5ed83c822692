// ── Control reconciler ──
//
// The vendor exposes several partially redundant control surfaces that
// fail under different conditions. A control call walks them in order
// and stops at the first that accepts. Rung failures are logged and
// absorbed; only "not logged in" escapes as an error.

use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use bluestar_api::models::{ControlPayload, PreferencesUpdate, ShadowUpdate};

use crate::directory::{self, DEFAULT_MODE};
use crate::error::CoreError;
use crate::model::{ControlIntent, ControlMethod, ControlOutcome, DeviceState};
use crate::session::SessionManager;

/// One control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rung {
    /// Shadow update over the broker.
    BrokerPublish,
    /// Mode-scoped `POST /things/{id}/preferences`.
    RestPreferences,
    /// `POST /things/{id}/state` with the desired-state wrapper.
    RestState,
    /// Ask the unit to re-report; never confirms the intent itself.
    ForceResync,
}

impl Rung {
    pub fn method(self) -> ControlMethod {
        match self {
            Self::BrokerPublish => ControlMethod::BrokerPrimary,
            Self::RestPreferences => ControlMethod::RestPreferences,
            Self::RestState => ControlMethod::RestState,
            Self::ForceResync => ControlMethod::ForceResync,
        }
    }
}

/// The full control ladder, in order.
pub const LADDER: [Rung; 4] = [
    Rung::BrokerPublish,
    Rung::RestPreferences,
    Rung::RestState,
    Rung::ForceResync,
];

/// Only the resync rung.
pub const RESYNC_ONLY: [Rung; 1] = [Rung::ForceResync];

/// Why a rung did not accept.
#[derive(Debug)]
enum RungFailure {
    /// The surface was not usable (e.g. broker down).
    Unavailable(&'static str),
    Failed(CoreError),
}

impl fmt::Display for RungFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => f.write_str(reason),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

impl From<CoreError> for RungFailure {
    fn from(e: CoreError) -> Self {
        Self::Failed(e)
    }
}

pub struct Reconciler<'a> {
    sessions: &'a SessionManager,
}

impl<'a> Reconciler<'a> {
    pub fn new(sessions: &'a SessionManager) -> Self {
        Self { sessions }
    }

    /// Apply `intent` to `device_id` through the full ladder, then
    /// re-fetch the device's state.
    pub async fn control(
        &self,
        device_id: &str,
        intent: &ControlIntent,
    ) -> Result<ControlOutcome, CoreError> {
        self.ensure_authenticated()?;
        let payload = intent.to_payload(Utc::now().timestamp_millis());
        Ok(self.run(device_id, &payload, &LADDER).await)
    }

    /// Request a re-report from the unit, then re-fetch its state.
    pub async fn force_sync(&self, device_id: &str) -> Result<ControlOutcome, CoreError> {
        self.ensure_authenticated()?;
        let payload = ControlPayload::new(Utc::now().timestamp_millis());
        Ok(self.run(device_id, &payload, &RESYNC_ONLY).await)
    }

    fn ensure_authenticated(&self) -> Result<(), CoreError> {
        if self.sessions.is_authenticated() {
            Ok(())
        } else {
            Err(CoreError::NotAuthenticated)
        }
    }

    /// Walk `ladder` until a rung accepts, then re-fetch. Never fails.
    pub async fn run(
        &self,
        device_id: &str,
        payload: &ControlPayload,
        ladder: &[Rung],
    ) -> ControlOutcome {
        let mut method = ControlMethod::Unconfirmed;

        for &rung in ladder {
            debug!(device_id, ?rung, "trying control rung");
            match self.attempt(rung, device_id, payload).await {
                Ok(()) => {
                    method = rung.method();
                    info!(device_id, %method, "control accepted");
                    break;
                }
                Err(failure) => {
                    warn!(device_id, ?rung, reason = %failure, "control rung failed");
                }
            }
        }

        if method == ControlMethod::Unconfirmed {
            warn!(device_id, "every control surface failed");
        }

        ControlOutcome::new(method, self.refetch(device_id).await)
    }

    async fn attempt(
        &self,
        rung: Rung,
        device_id: &str,
        payload: &ControlPayload,
    ) -> Result<(), RungFailure> {
        match rung {
            Rung::BrokerPublish => self.broker_publish(device_id, payload),
            Rung::RestPreferences => self.rest_preferences(device_id, payload).await,
            Rung::RestState => self.rest_state(device_id, payload).await,
            Rung::ForceResync => self.force_resync(device_id).await,
        }
    }

    fn broker_publish(&self, device_id: &str, payload: &ControlPayload) -> Result<(), RungFailure> {
        let publisher = self
            .sessions
            .connected_publisher()
            .ok_or(RungFailure::Unavailable("broker not connected"))?;
        if publisher.publish(device_id, payload) {
            Ok(())
        } else {
            Err(RungFailure::Unavailable("broker publish failed"))
        }
    }

    async fn rest_preferences(
        &self,
        device_id: &str,
        payload: &ControlPayload,
    ) -> Result<(), RungFailure> {
        // The preferences endpoint is keyed by the active mode, so the
        // current one has to be read first.
        let snapshot = directory::fetch_all(self.sessions).await?;
        if snapshot.device(device_id).is_none() {
            return Err(CoreError::DeviceNotFound {
                identifier: device_id.to_owned(),
            }
            .into());
        }
        let observed = snapshot.state(device_id).map(|s| s.mode);
        let mode = effective_mode(payload, observed);
        let update = PreferencesUpdate::for_mode(mode, payload);
        debug!(device_id, mode, "posting mode-scoped preferences");

        self.sessions
            .call(|client, session| {
                let update = &update;
                async move { client.update_preferences(&session, device_id, update).await }
            })
            .await?;
        Ok(())
    }

    async fn rest_state(&self, device_id: &str, payload: &ControlPayload) -> Result<(), RungFailure> {
        let update = ShadowUpdate::desired(payload.clone());
        self.sessions
            .call(|client, session| {
                let update = &update;
                async move { client.update_state(&session, device_id, update).await }
            })
            .await?;
        Ok(())
    }

    async fn force_resync(&self, device_id: &str) -> Result<(), RungFailure> {
        if let Some(publisher) = self.sessions.connected_publisher() {
            if publisher.force_sync(device_id) {
                return Ok(());
            }
            debug!(device_id, "broker force-sync failed, using REST");
        }
        self.sessions
            .call(|client, session| async move { client.force_fetch(&session, device_id).await })
            .await?;
        Ok(())
    }

    async fn refetch(&self, device_id: &str) -> Option<DeviceState> {
        match directory::fetch_all(self.sessions).await {
            Ok(mut snapshot) => snapshot.states.swap_remove(device_id),
            Err(e) => {
                warn!(device_id, error = %e, "post-control refresh failed");
                None
            }
        }
    }
}

/// The mode the preferences update is scoped to: the new mode when the
/// intent changes it, else the observed one.
pub fn effective_mode(payload: &ControlPayload, observed: Option<i64>) -> i64 {
    payload.mode_code().or(observed).unwrap_or(DEFAULT_MODE)
}
