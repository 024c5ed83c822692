// ── Domain model ──
//
// Canonical device and control types. Everything the CLI renders or the
// reconciler consumes lives here, independent of the vendor wire shapes.

pub mod control;
pub mod device;

// ── Re-exports ──────────────────────────────────────────────────────

pub use control::{ControlIntent, ControlMethod, ControlOutcome, UpdateStatus};
pub use device::{Device, DeviceState, Snapshot};
