//! CLI configuration -- thin wrapper around `bluestar_config`.
//!
//! Adds flag-override resolution on top of the shared profile loading
//! (--phone, --base-url, --timeout, --no-broker).

use std::time::Duration;

use bluestar_config::{Config, ConfigError, Profile};
use bluestar_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use bluestar_config::{config_path, load_config_or_default};

/// Resolve the active profile and layer CLI flags over it.
pub fn selected_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let (name, mut profile) =
        bluestar_config::select_profile(cfg, global.profile.as_deref()).map_err(|e| match e {
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            },
            other => other.into(),
        })?;

    if let Some(ref phone) = global.phone {
        profile.phone = Some(phone.clone());
    }
    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if global.no_broker {
        profile.broker = Some(false);
    }
    Ok((name, profile))
}

/// Build the runtime `ControllerConfig` from config file, profile and flags.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, profile) = selected_profile(global, &cfg)?;
    Ok(bluestar_config::profile_to_controller_config(
        &profile,
        &name,
        &cfg.defaults,
    )?)
}

/// Override the polling period, e.g. from `watch --interval`.
pub fn with_refresh_interval(mut cfg: ControllerConfig, secs: Option<u64>) -> ControllerConfig {
    if let Some(secs) = secs {
        cfg.refresh_interval = Duration::from_secs(secs);
    }
    cfg
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}
