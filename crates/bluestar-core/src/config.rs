// ── Runtime connection configuration ──
//
// Describes *how* to reach the Bluestar cloud for one account. Carries
// credentials and tuning but never touches disk; the CLI builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use bluestar_api::auth::DEFAULT_COUNTRY_CODE;
use bluestar_api::transport::TransportConfig;
use bluestar_api::{Account, BrokerConfig, RetryPolicy};

/// Broker fast-path settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Attach a broker publisher after login when credentials allow it.
    pub enabled: bool,
    pub connection: BrokerConfig,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            connection: BrokerConfig::default(),
        }
    }
}

/// Configuration for one account.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub phone: String,
    pub password: SecretString,
    /// First host tried at login.
    pub base_url: Url,
    /// Tried after `base_url`. Empty means the other known vendor host.
    pub fallback_base_urls: Vec<Url>,
    pub country_code: String,
    /// Total timeout for each REST call.
    pub timeout: Duration,
    /// Background refresh period. Zero disables the polling task.
    pub refresh_interval: Duration,
    pub retry: RetryPolicy,
    pub broker: BrokerSettings,
    /// Serialize `control_device` / `force_sync` per device.
    pub serialize_per_device: bool,
}

impl ControllerConfig {
    pub fn new(phone: impl Into<String>, password: SecretString, base_url: Url) -> Self {
        Self {
            phone: phone.into(),
            password,
            base_url,
            fallback_base_urls: Vec::new(),
            country_code: DEFAULT_COUNTRY_CODE.to_owned(),
            timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            broker: BrokerSettings::default(),
            serialize_per_device: true,
        }
    }

    pub(crate) fn account(&self) -> Account {
        Account::new(self.phone.clone(), self.password.clone(), self.base_url.clone())
            .with_fallbacks(self.fallback_base_urls.clone())
            .with_country_code(self.country_code.clone())
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }
}
