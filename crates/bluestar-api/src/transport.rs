// Shared transport configuration for building reqwest::Client instances.
//
// Every REST call to the vendor backend carries the same spoofed mobile
// app headers; they are installed once as client default headers here.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

use crate::error::Error;

/// Header carrying the bearer session token on authenticated calls.
pub const SESSION_HEADER: &str = "x-app-session";

/// User agent of the Android app the backend expects.
pub const APP_USER_AGENT: &str = "com.bluestarindia.bluesmart";

/// Fixed app identification headers. The backend rejects requests without them.
pub const APP_HEADERS: [(&str, &str); 3] = [
    ("x-app-ver", "v4.11.4-133"),
    ("x-os-name", "Android"),
    ("x-os-ver", "v13-33"),
];

/// TLS verification mode for the REST client.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the bundled webpki roots.
    #[default]
    System,
    /// Accept any certificate (debugging proxies only).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the app identification headers installed.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(APP_USER_AGENT)
            .default_headers(app_headers());

        if matches!(self.tls, TlsMode::DangerAcceptInvalid) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// The default header set sent on every vendor request.
pub fn app_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in APP_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_headers_are_complete() {
        let headers = app_headers();
        assert_eq!(headers["x-app-ver"], "v4.11.4-133");
        assert_eq!(headers["x-os-name"], "Android");
        assert_eq!(headers["x-os-ver"], "v13-33");
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn default_timeout_is_bounded() {
        assert_eq!(TransportConfig::default().timeout, Duration::from_secs(30));
    }
}
