// Login search and session values.
//
// The backend accepts the phone number in one of several formats and is
// reachable through more than one host, neither of which is documented.
// `login` walks every (host, format) pair before giving up.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::client::{BluestarClient, parse_response};
use crate::credentials::BrokerCredentials;
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse};

/// Primary vendor host.
pub const DEFAULT_BASE_URL: &str = "https://api.bluestarindia.com/prod";

/// Alternate gateway for the same backend.
pub const ALTERNATE_BASE_URL: &str = "https://n3on22cp53.execute-api.ap-south-1.amazonaws.com/prod";

/// Country calling code prepended when trying prefixed phone formats.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

const LOGIN_PATH: &str = "auth/login";
const AUTH_TYPE_PHONE: u8 = 1;

/// Login identity plus the hosts to try it against.
#[derive(Debug, Clone)]
pub struct Account {
    pub phone: String,
    pub password: SecretString,
    pub base_url: Url,
    /// Tried in order after `base_url`. Empty means "the other known host".
    pub fallback_base_urls: Vec<Url>,
    pub country_code: String,
}

impl Account {
    pub fn new(phone: impl Into<String>, password: SecretString, base_url: Url) -> Self {
        Self {
            phone: phone.into(),
            password,
            base_url,
            fallback_base_urls: Vec::new(),
            country_code: DEFAULT_COUNTRY_CODE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: Vec<Url>) -> Self {
        self.fallback_base_urls = fallbacks;
        self
    }

    #[must_use]
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    /// Hosts in search order, duplicates removed.
    pub fn candidate_urls(&self) -> Vec<Url> {
        let fallbacks = if self.fallback_base_urls.is_empty() {
            known_alternate(&self.base_url).into_iter().collect()
        } else {
            self.fallback_base_urls.clone()
        };

        let mut urls = vec![self.base_url.clone()];
        for url in fallbacks {
            if !urls.iter().any(|u| same_base(u, &url)) {
                urls.push(url);
            }
        }
        urls
    }

    /// Phone formats in search order: raw, `<cc><phone>`, `+<cc><phone>`.
    pub fn phone_formats(&self) -> Vec<String> {
        let raw = self.phone.trim();
        let cc = self.country_code.trim_start_matches('+');
        let mut formats: Vec<String> = Vec::with_capacity(3);
        for candidate in [raw.to_owned(), format!("{cc}{raw}"), format!("+{cc}{raw}")] {
            if !formats.contains(&candidate) {
                formats.push(candidate);
            }
        }
        formats
    }
}

/// The other known vendor host, if `base` is one of them.
fn known_alternate(base: &Url) -> Option<Url> {
    let other = match base.host_str()? {
        h if host_of(DEFAULT_BASE_URL).as_deref() == Some(h) => ALTERNATE_BASE_URL,
        h if host_of(ALTERNATE_BASE_URL).as_deref() == Some(h) => DEFAULT_BASE_URL,
        _ => return None,
    };
    Url::parse(other).ok()
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_owned)
}

fn same_base(a: &Url, b: &Url) -> bool {
    a.as_str().trim_end_matches('/') == b.as_str().trim_end_matches('/')
}

/// Per-pair retry policy for the login search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per (host, format) pair, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// An authenticated session. Produced by [`BluestarClient::login`];
/// a re-login yields a new value rather than mutating this one.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    /// Host that accepted the login. All REST calls go here.
    pub base_url: Url,
    /// The phone format the backend accepted.
    pub auth_id: String,
    pub user_id: Option<String>,
    /// Broker credentials, when the login response carried usable ones.
    pub broker: Option<BrokerCredentials>,
}

impl Session {
    pub fn new(token: SecretString, base_url: Url) -> Self {
        Self {
            token,
            base_url,
            auth_id: String::new(),
            user_id: None,
            broker: None,
        }
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub(crate) fn token_header(&self) -> &str {
        self.token.expose_secret()
    }
}

impl BluestarClient {
    /// Authenticate, trying every phone format against every host.
    ///
    /// Transient failures (transport errors, 502/503/504) are retried per
    /// pair with exponential backoff. Any other failure, 401 and 403
    /// included, moves on to the next pair. Only when the whole search is
    /// exhausted does this return [`Error::Authentication`], carrying the
    /// last failure seen.
    pub async fn login(&self) -> Result<Session, Error> {
        let account = self.account();
        let mut last_error: Option<Error> = None;

        for base_url in account.candidate_urls() {
            for auth_id in account.phone_formats() {
                match self.login_pair(&base_url, &auth_id).await {
                    Ok(response) => match session_from(response, &base_url, &auth_id) {
                        Some(session) => {
                            info!(host = %base_url, "logged in");
                            return Ok(session);
                        }
                        None => {
                            warn!(host = %base_url, "login returned no session token");
                            last_error = Some(Error::Authentication {
                                message: "login response carried no session token".into(),
                                status: Some(200),
                            });
                        }
                    },
                    Err(e) => {
                        debug!(host = %base_url, error = %e, "login attempt rejected");
                        last_error = Some(e);
                    }
                }
            }
        }

        let (message, status) = match last_error {
            Some(Error::Authentication { message, status }) => (message, status),
            Some(e) => (e.to_string(), e.status()),
            None => ("no login candidates".to_owned(), None),
        };
        error!(status = ?status, "login search exhausted: {message}");
        Err(Error::Authentication { message, status })
    }

    /// One (host, format) pair, with retry on transient failures.
    async fn login_pair(&self, base_url: &Url, auth_id: &str) -> Result<LoginResponse, Error> {
        let retry = self.retry_policy();
        let mut attempt = 1;
        loop {
            match self.login_once(base_url, auth_id).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.delay_after(attempt);
                    debug!(attempt, error = %e, ?delay, "transient login failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn login_once(&self, base_url: &Url, auth_id: &str) -> Result<LoginResponse, Error> {
        let url = Self::endpoint(base_url, LOGIN_PATH)?;
        debug!("POST {}", url);

        let body = LoginRequest {
            auth_id,
            auth_type: AUTH_TYPE_PHONE,
            password: self.account().password.expose_secret(),
        };

        let resp = self.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if matches!(status.as_u16(), 401 | 403) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {status}): {body}"),
                status: Some(status.as_u16()),
            });
        }

        parse_response(resp).await
    }
}

fn session_from(response: LoginResponse, base_url: &Url, auth_id: &str) -> Option<Session> {
    let token = response.session.clone().filter(|t| !t.is_empty())?;

    let broker = if response.mi.is_some() {
        match BrokerCredentials::extract(&response) {
            Ok(creds) => Some(creds),
            Err(e) => {
                warn!(error = %e, "broker credentials unusable, continuing REST-only");
                None
            }
        }
    } else {
        debug!("login response has no broker credentials");
        None
    };

    Some(Session {
        token: SecretString::from(token),
        base_url: base_url.clone(),
        auth_id: auth_id.to_owned(),
        user_id: response.user_id(),
        broker,
    })
}
