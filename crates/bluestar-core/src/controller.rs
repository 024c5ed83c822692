// ── Controller abstraction ──
//
// Lifecycle for one account: login, the polling driver, control routing
// through the reconciler, and the observable snapshot the host renders.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::directory;
use crate::error::CoreError;
use crate::model::{ControlIntent, ControlOutcome, Snapshot, UpdateStatus};
use crate::reconcile::Reconciler;
use crate::session::SessionManager;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing touches the
/// network until [`connect()`](Self::connect) or a direct call.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    sessions: SessionManager,
    snapshot: watch::Sender<Arc<Snapshot>>,
    update_status: watch::Sender<UpdateStatus>,
    device_locks: DashMap<String, Arc<Mutex<()>>>,
    cancel: CancellationToken,
    /// Child token for the current connection. Cancelled on disconnect,
    /// replaced on the next connect.
    cancel_child: std::sync::Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller from configuration. Does NOT connect.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let sessions = SessionManager::new(&config)?;
        Ok(Self::with_sessions(config, sessions))
    }

    /// Create a controller around an existing session manager.
    pub fn with_sessions(config: ControllerConfig, sessions: SessionManager) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (update_status, _) = watch::channel(UpdateStatus::Idle);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                sessions,
                snapshot,
                update_status,
                device_locks: DashMap::new(),
                cancel,
                cancel_child: std::sync::Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, take the first snapshot, and start the polling task.
    ///
    /// A failed first refresh is returned; the polling task is only
    /// spawned once a snapshot exists. Reconnecting stops the previous
    /// polling task first.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let child = self.inner.cancel.child_token();
        std::mem::replace(
            &mut *self
                .inner
                .cancel_child
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            child.clone(),
        )
        .cancel();
        self.join_tasks().await;

        self.inner.sessions.login().await?;
        self.refresh().await?;

        let interval = self.inner.config.refresh_interval;
        if interval.is_zero() {
            debug!("background refresh disabled");
        } else {
            let ctrl = self.clone();
            let handle = tokio::spawn(refresh_task(ctrl, interval, child));
            self.inner.task_handles.lock().await.push(handle);
        }

        info!(devices = self.snapshot().len(), "connected");
        Ok(())
    }

    /// Log in without fetching or polling.
    pub async fn login(&self) -> Result<(), CoreError> {
        self.inner.sessions.login().await.map(|_| ())
    }

    /// Stop polling and tear down the session. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        self.inner
            .cancel_child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        self.join_tasks().await;

        self.inner.sessions.disconnect();
        debug!("disconnected");
    }

    async fn join_tasks(&self) {
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    // ── Polling driver ───────────────────────────────────────────

    /// Fetch the directory without touching the shared snapshot.
    pub async fn fetch_all(&self) -> Result<Snapshot, CoreError> {
        directory::fetch_all(&self.inner.sessions).await
    }

    /// Fetch and atomically replace the shared snapshot.
    ///
    /// Failure leaves the previous snapshot in place and is published as
    /// [`UpdateStatus::Failed`]; retrying is the caller's business.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        match self.fetch_all().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.snapshot.send_replace(Arc::clone(&snapshot));
                self.inner
                    .update_status
                    .send_replace(UpdateStatus::Ok { at: Utc::now() });
                Ok(snapshot)
            }
            Err(e) => {
                self.inner.update_status.send_replace(UpdateStatus::Failed {
                    message: e.to_string(),
                    at: Utc::now(),
                });
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn update_status(&self) -> UpdateStatus {
        self.inner.update_status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.update_status.subscribe()
    }

    // ── Control ──────────────────────────────────────────────────

    /// Apply a control intent through the fallback ladder.
    ///
    /// Only fails when not logged in; everything else degrades to a
    /// weaker [`ControlOutcome`]. The cached snapshot entry is patched
    /// from the intent immediately; the next poll overwrites it.
    pub async fn control_device(
        &self,
        device_id: &str,
        intent: &ControlIntent,
    ) -> Result<ControlOutcome, CoreError> {
        let guard = self.device_guard(device_id).await;
        let result = Reconciler::new(&self.inner.sessions)
            .control(device_id, intent)
            .await;
        self.release_guard(device_id, guard);
        let outcome = result?;
        self.patch_snapshot(device_id, intent);
        Ok(outcome)
    }

    /// Ask the unit to re-report its state, then re-fetch it.
    pub async fn force_sync(&self, device_id: &str) -> Result<ControlOutcome, CoreError> {
        let guard = self.device_guard(device_id).await;
        let result = Reconciler::new(&self.inner.sessions)
            .force_sync(device_id)
            .await;
        self.release_guard(device_id, guard);
        result
    }

    async fn device_guard(&self, device_id: &str) -> Option<OwnedMutexGuard<()>> {
        if !self.inner.config.serialize_per_device {
            return None;
        }
        let lock = Arc::clone(
            self.inner
                .device_locks
                .entry(device_id.to_owned())
                .or_default()
                .value(),
        );
        Some(lock.lock_owned().await)
    }

    /// Unlock, and forget the device's mutex once nobody else holds or
    /// waits on it.
    fn release_guard(&self, device_id: &str, guard: Option<OwnedMutexGuard<()>>) {
        if guard.is_none() {
            return;
        }
        drop(guard);
        self.inner
            .device_locks
            .remove_if(device_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Devices with a live per-device mutex.
    pub fn locked_device_count(&self) -> usize {
        self.inner.device_locks.len()
    }

    fn patch_snapshot(&self, device_id: &str, intent: &ControlIntent) {
        let now_ms = Utc::now().timestamp_millis();
        self.inner.snapshot.send_if_modified(|current| {
            if !current.states.contains_key(device_id) {
                return false;
            }
            let mut next = Snapshot::clone(current);
            if let Some(state) = next.states.get_mut(device_id) {
                state.apply(intent, now_ms);
            }
            *current = Arc::new(next);
            true
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh the snapshot until cancelled.
async fn refresh_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
