// bluestar-core: Session, device directory, control ladder and polling driver.

pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BrokerSettings, ControllerConfig};
pub use controller::Controller;
pub use error::CoreError;
pub use model::{
    ControlIntent, ControlMethod, ControlOutcome, Device, DeviceState, Snapshot, UpdateStatus,
};
pub use reconcile::{LADDER, Reconciler, Rung};
pub use session::SessionManager;
