use thiserror::Error;

/// Top-level error type for the `bluestar-api` crate.
///
/// Covers every failure mode of the vendor surfaces: login search,
/// authenticated REST calls, credential unpacking, and transport.
/// Broker failures never appear here -- the publisher absorbs them.
/// `bluestar-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login search exhausted (bad password, locked account, or every
    /// host/format pair failed). Carries the last observed failure.
    #[error("Authentication failed: {message}")]
    Authentication { message: String, status: Option<u16> },

    /// An authenticated call was rejected with HTTP 401.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The packed broker credentials in the login response are unusable.
    #[error("Malformed broker credentials: {reason}")]
    MalformedCredentials { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error (client or broker).
    #[error("TLS error: {0}")]
    Tls(String),

    /// The backend answered with a gateway-class error (502/503/504).
    #[error("Backend temporarily unavailable (HTTP {status})")]
    TransientBackend { status: u16 },

    // ── API ─────────────────────────────────────────────────────────
    /// Any other non-success status from a REST endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is no longer
    /// accepted and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::TransientBackend { .. } => true,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::SessionExpired => Some(401),
            Self::TransientBackend { status } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
