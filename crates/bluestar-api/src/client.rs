// Bluestar REST client
//
// Wraps `reqwest::Client` with vendor URL construction, session header
// injection, and status mapping. Login lives in `auth.rs`, device
// endpoints in `things.rs`; this module keeps to transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{Account, RetryPolicy, Session};
use crate::error::Error;
use crate::transport::{SESSION_HEADER, TransportConfig};

/// Raw HTTP client for the Bluestar cloud API.
///
/// Holds the account used for login and the retry policy for the login
/// search. Authenticated calls take an explicit [`Session`]; the client
/// itself never caches a token.
pub struct BluestarClient {
    http: reqwest::Client,
    account: Account,
    retry: RetryPolicy,
}

impl BluestarClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(account: Account, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, account))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for installing the app headers
    /// (see [`crate::transport::app_headers`]).
    pub fn with_client(http: reqwest::Client, account: Account) -> Self {
        Self {
            http,
            account,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the login retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{path}`, tolerant of a trailing slash on the base.
    pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
        let base = base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET against the session's host.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<T, Error> {
        let url = Self::endpoint(&session.base_url, path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header(SESSION_HEADER, session.token_header())
            .send()
            .await?;

        parse_response(resp).await
    }

    /// Authenticated POST with a JSON body against the session's host.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = Self::endpoint(&session.base_url, path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(SESSION_HEADER, session.token_header())
            .json(body)
            .send()
            .await?;

        parse_response(resp).await
    }
}

/// Map the status line, then deserialize the body.
///
/// 401 means the session is gone; 502/503/504 are gateway hiccups worth
/// retrying; anything else non-2xx is an API error. An empty 2xx body
/// deserializes as JSON `null`.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::SessionExpired);
    }

    if matches!(status.as_u16(), 502..=504) {
        return Err(Error::TransientBackend {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await?;
    let text = if body.trim().is_empty() { "null" } else { &body };

    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let a = BluestarClient::endpoint(&Url::parse("https://h.example/prod/").unwrap(), "things");
        let b = BluestarClient::endpoint(&Url::parse("https://h.example/prod").unwrap(), "things");
        assert_eq!(a.unwrap().as_str(), "https://h.example/prod/things");
        assert_eq!(b.unwrap().as_str(), "https://h.example/prod/things");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert!(preview(&body).len() <= 200);
    }
}
