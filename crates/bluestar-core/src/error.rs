// ── Core error types ──
//
// Domain errors from bluestar-core. Consumers see the failure taxonomy
// (bad credentials, transient backend, missing device, no session), not
// raw HTTP statuses. `From<bluestar_api::Error>` does the translation.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Not authenticated -- log in first")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Malformed broker credentials: {reason}")]
    MalformedCredentials { reason: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Backend temporarily unavailable: {message}")]
    TransientBackend { message: String },

    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures a later retry (the next poll) may clear.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientBackend { .. } | Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bluestar_api::Error> for CoreError {
    fn from(err: bluestar_api::Error) -> Self {
        use bluestar_api::Error as ApiError;

        match err {
            ApiError::Authentication { message, .. } => CoreError::AuthenticationFailed { message },
            ApiError::SessionExpired => CoreError::AuthenticationFailed {
                message: "session rejected by backend".into(),
            },
            ApiError::MalformedCredentials { reason } => CoreError::MalformedCredentials { reason },
            ApiError::TransientBackend { status } => CoreError::TransientBackend {
                message: format!("HTTP {status}"),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::TransientBackend {
                        message: e.to_string(),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            ApiError::Tls(message) => CoreError::Config { message },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, .. } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
