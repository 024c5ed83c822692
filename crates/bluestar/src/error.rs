//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use bluestar_config::ConfigError;
use bluestar_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Bluestar cloud at {url}")]
    #[diagnostic(
        code(bluestar::connection_failed),
        help(
            "Check your network connection.\n\
             URL: {url}\n\
             A different host can be set with --base-url."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Bluestar backend is temporarily unavailable ({message})")]
    #[diagnostic(
        code(bluestar::backend_unavailable),
        help("The vendor gateway returned a transient error. Try again shortly.")
    )]
    BackendUnavailable { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(bluestar::auth_failed),
        help(
            "Verify the phone number and password for profile '{profile}'.\n\
             The phone number is entered without the country code."
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(bluestar::no_credentials),
        help(
            "Add phone and password to the profile in {path},\n\
             or set BLUESTAR_PHONE and BLUESTAR_PASSWORD."
        )
    )]
    NoCredentials { profile: String, path: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(bluestar::not_found),
        help("Run: bluestar devices to see available units")
    )]
    NotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error: {message}")]
    #[diagnostic(code(bluestar::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bluestar::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bluestar::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(bluestar::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out")]
    #[diagnostic(
        code(bluestar::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(bluestar::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::BackendUnavailable { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials {
                profile,
                path: bluestar_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotAuthenticated => CliError::AuthFailed {
                profile: "current".into(),
                message: "no active session".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::TransientBackend { message } => CliError::BackendUnavailable { message },

            CoreError::Timeout { .. } => CliError::Timeout,

            CoreError::DeviceNotFound { identifier } => CliError::NotFound { identifier },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::MalformedCredentials { reason } => CliError::ApiError {
                message: format!("malformed broker credentials: {reason}"),
            },

            CoreError::Api { message, .. } | CoreError::Internal(message) => {
                CliError::ApiError { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::NotAuthenticated, exit_code::AUTH),
            (
                CoreError::DeviceNotFound {
                    identifier: "ac-1".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::TransientBackend {
                    message: "HTTP 502".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 30 }, exit_code::TIMEOUT),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }
}
