// Broker credential extraction.
//
// The login response carries the broker endpoint and key pair packed as
// base64("endpoint::accessKey::secretKey") in the `mi` field.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;
use crate::models::LoginResponse;

const FIELD_SEPARATOR: &str = "::";

/// Everything needed to open the broker connection for one login.
#[derive(Debug, Clone)]
pub struct BrokerCredentials {
    /// Broker hostname (no scheme, no port).
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: SecretString,
    /// Session token of the login these credentials came from.
    pub session_id: String,
    pub user_id: Option<String>,
}

impl BrokerCredentials {
    /// Unpack broker credentials from a successful login response.
    ///
    /// Fails if the session token is missing, `mi` is absent or not valid
    /// base64/UTF-8, or does not split into exactly three non-empty parts.
    pub fn extract(response: &LoginResponse) -> Result<Self, Error> {
        let session_id = response
            .session
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("login response has no session token"))?;

        let packed = response
            .mi
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("login response has no `mi` field"))?;

        let decoded = STANDARD
            .decode(packed.trim())
            .map_err(|e| malformed(format!("`mi` is not valid base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| malformed("`mi` does not decode to UTF-8"))?;

        let parts: Vec<&str> = decoded.split(FIELD_SEPARATOR).collect();
        let [endpoint, access_key, secret_key] = parts.as_slice() else {
            return Err(malformed(format!(
                "expected 3 `::`-separated parts, found {}",
                parts.len()
            )));
        };

        let creds = Self {
            endpoint: (*endpoint).to_owned(),
            access_key: (*access_key).to_owned(),
            secret_key: SecretString::from((*secret_key).to_owned()),
            session_id,
            user_id: response.user_id(),
        };
        if creds.endpoint.is_empty()
            || creds.access_key.is_empty()
            || creds.secret_key.expose_secret().is_empty()
        {
            return Err(malformed("`mi` contains an empty part"));
        }
        Ok(creds)
    }

    /// `true` when all five components, user id included, are present and
    /// non-empty. Extraction alone does not guarantee this.
    pub fn is_valid(&self) -> bool {
        !self.endpoint.is_empty()
            && !self.access_key.is_empty()
            && !self.secret_key.expose_secret().is_empty()
            && !self.session_id.is_empty()
            && self.user_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Client identifier presented to the broker.
    pub fn client_id(&self) -> String {
        format!("u-{}", self.session_id)
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedCredentials {
        reason: reason.into(),
    }
}
