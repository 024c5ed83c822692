//! Configuration for the bluestar CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `bluestar_core::ControllerConfig`. The CLI layers
//! its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use bluestar_core::ControllerConfig;

/// Keyring service name; entries are keyed `"<profile>/password"`.
pub const KEYRING_SERVICE: &str = "bluestar";

/// Default primary host.
pub const DEFAULT_BASE_URL: &str = "https://api.bluestarindia.com/prod";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Polling period in seconds for `watch`. 0 disables polling.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    5
}

/// A named account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Registered phone number, without country code.
    pub phone: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Primary API host. Defaults to the vendor's main host.
    pub base_url: Option<String>,

    /// Extra hosts tried at login after `base_url`.
    #[serde(default)]
    pub fallback_base_urls: Vec<String>,

    /// Country calling code used for prefixed phone formats.
    pub country_code: Option<String>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override polling period (seconds).
    pub refresh_interval: Option<u64>,

    /// Use the broker fast path (default true).
    pub broker: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("in", "bluestar", "bluestar").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bluestar");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, merged with `BLUESTAR_`-prefixed env vars
/// (`BLUESTAR_DEFAULTS__TIMEOUT=10`, `BLUESTAR_DEFAULT_PROFILE=home`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BLUESTAR_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// A copy of `cfg` with plaintext passwords masked.
pub fn redacted(cfg: &Config) -> Config {
    let mut redacted = cfg.clone();
    for profile in redacted.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("********".into());
        }
    }
    redacted
}

/// Render a config as TOML with plaintext passwords masked.
pub fn to_redacted_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(&redacted(cfg))?)
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick the named profile, else the configured default. A missing
/// `"default"` profile yields an empty one so env/flags can fill it in.
pub fn select_profile(cfg: &Config, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
    let explicit = name.is_some();
    let name = name
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    match cfg.profiles.get(&name) {
        Some(profile) => Ok((name, profile.clone())),
        None if !explicit => Ok((name, Profile::default())),
        None => Err(ConfigError::UnknownProfile { name }),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the phone number: profile, then `BLUESTAR_PHONE`.
pub fn resolve_phone(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    let phone = profile
        .phone
        .clone()
        .or_else(|| std::env::var("BLUESTAR_PHONE").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    validate_phone(&phone)?;
    Ok(phone)
}

fn validate_phone(phone: &str) -> Result<(), ConfigError> {
    let digits = phone.trim().trim_start_matches('+');
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation {
            field: "phone".into(),
            reason: format!("expected digits only, got '{phone}'"),
        });
    }
    Ok(())
}

/// Resolve the password: env var → keyring → plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var (profile-specific name first)
    let env_names = profile
        .password_env
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("BLUESTAR_PASSWORD"));
    for env_name in env_names {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let phone = resolve_phone(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    let base_url = parse_url(
        "base_url",
        profile.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
    )?;
    let fallback_base_urls = profile
        .fallback_base_urls
        .iter()
        .map(|raw| parse_url("fallback_base_urls", raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut cfg = ControllerConfig::new(phone, password, base_url);
    cfg.fallback_base_urls = fallback_base_urls;
    if let Some(ref cc) = profile.country_code {
        cfg.country_code.clone_from(cc);
    }
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.refresh_interval =
        Duration::from_secs(profile.refresh_interval.unwrap_or(defaults.refresh_interval));
    cfg.broker.enabled = profile.broker.unwrap_or(true);
    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_profiles_from_toml() {
        let file = write_config(
            r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
phone = "9876543210"
password = "pw"
fallback_base_urls = ["https://backup.example/prod"]
broker = false
"#,
        );

        let cfg = load_config_from(file.path()).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("home"));
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.refresh_interval, 5);

        let (name, profile) = select_profile(&cfg, None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.phone.as_deref(), Some("9876543210"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn unknown_explicit_profile_is_an_error() {
        let cfg = Config::default();
        assert!(matches!(
            select_profile(&cfg, Some("work")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        assert!(select_profile(&cfg, None).is_ok());
    }

    #[test]
    fn profile_translates_to_controller_config() {
        let profile = Profile {
            phone: Some("9876543210".into()),
            password: Some("pw".into()),
            password_env: Some("BLUESTAR_TEST_UNSET_PASSWORD_VAR".into()),
            fallback_base_urls: vec!["https://backup.example/prod".into()],
            timeout: Some(12),
            broker: Some(false),
            ..Profile::default()
        };

        let cfg = profile_to_controller_config(&profile, "test-profile", &Defaults::default())
            .unwrap();
        assert_eq!(cfg.phone, "9876543210");
        assert_eq!(cfg.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(cfg.fallback_base_urls.len(), 1);
        assert_eq!(cfg.timeout, Duration::from_secs(12));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(5));
        assert!(!cfg.broker.enabled);
        assert!(!cfg.password.expose_secret().is_empty());
    }

    #[test]
    fn rejects_bad_phone_and_url() {
        assert!(validate_phone("98765x").is_err());
        assert!(validate_phone("+919876543210").is_ok());
        assert!(parse_url("base_url", "not a url").is_err());
    }

    #[test]
    fn redacted_toml_masks_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let rendered = to_redacted_toml(&cfg).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
    }
}
