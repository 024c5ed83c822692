// ── Auth session manager ──
//
// Owns the current `Session` value and the optional broker publisher.
// A re-login swaps in a fresh `Arc<Session>`; callers holding the old one
// keep a consistent view until they ask again.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};

use bluestar_api::{BluestarClient, BrokerPublisher, Session, ShadowPublisher};

use crate::config::{BrokerSettings, ControllerConfig};
use crate::error::CoreError;

pub struct SessionManager {
    client: Arc<BluestarClient>,
    session: ArcSwapOption<Session>,
    publisher: RwLock<Option<Arc<dyn ShadowPublisher>>>,
    broker: BrokerSettings,
}

impl SessionManager {
    pub fn new(config: &ControllerConfig) -> Result<Self, CoreError> {
        let client = BluestarClient::new(config.account(), &config.transport())?
            .with_retry(config.retry);
        Ok(Self::with_client(client, config.broker.clone()))
    }

    /// Build around a pre-configured client (tests, custom transports).
    pub fn with_client(client: BluestarClient, broker: BrokerSettings) -> Self {
        Self {
            client: Arc::new(client),
            session: ArcSwapOption::empty(),
            publisher: RwLock::new(None),
            broker,
        }
    }

    pub fn client(&self) -> &BluestarClient {
        &self.client
    }

    /// The current session, if logged in.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.load().is_some()
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Run the login search and install the resulting session.
    ///
    /// When the broker is enabled and the login carried usable broker
    /// credentials, a publisher is connected as well. Broker failure is
    /// logged and the session stays usable over REST.
    pub async fn login(&self) -> Result<Arc<Session>, CoreError> {
        let session = Arc::new(self.client.login().await?);
        self.session.store(Some(Arc::clone(&session)));

        if self.broker.enabled {
            self.attach_broker(&session).await;
        } else {
            debug!("broker disabled, REST-only");
        }
        Ok(session)
    }

    async fn attach_broker(&self, session: &Session) {
        self.detach_publisher();

        let Some(creds) = session.broker.as_ref() else {
            info!("no broker credentials in login, REST-only");
            return;
        };
        if !creds.is_valid() {
            info!("broker credentials incomplete, REST-only");
            return;
        }

        let publisher = BrokerPublisher::new(self.broker.connection.clone());
        if publisher.connect(creds).await {
            self.attach_publisher(Arc::new(publisher));
        } else {
            warn!(endpoint = %creds.endpoint, "broker unavailable, continuing REST-only");
        }
    }

    // ── Publisher slot ───────────────────────────────────────────────

    /// Install a publisher, disconnecting any previous one.
    pub fn attach_publisher(&self, publisher: Arc<dyn ShadowPublisher>) {
        let previous = self
            .publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(publisher);
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    pub fn publisher(&self) -> Option<Arc<dyn ShadowPublisher>> {
        self.publisher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The publisher, only if it currently reports connected.
    pub fn connected_publisher(&self) -> Option<Arc<dyn ShadowPublisher>> {
        self.publisher().filter(|p| p.is_connected())
    }

    fn detach_publisher(&self) {
        let previous = self
            .publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    /// Drop the session and tear down the broker link. Always safe.
    pub fn disconnect(&self) {
        self.detach_publisher();
        self.session.store(None);
    }

    // ── Authenticated calls ──────────────────────────────────────────

    /// Run an authenticated REST call with the 401 rule: on an expired
    /// session, log in once and retry once. A second 401 is surfaced as
    /// [`CoreError::AuthenticationFailed`].
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: Fn(Arc<BluestarClient>, Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, bluestar_api::Error>>,
    {
        let session = self.current().ok_or(CoreError::NotAuthenticated)?;

        match op(Arc::clone(&self.client), session).await {
            Err(e) if e.is_auth_expired() => {
                info!("session expired, logging in again");
                let fresh = self.login().await?;
                match op(Arc::clone(&self.client), fresh).await {
                    Err(e) if e.is_auth_expired() => Err(CoreError::AuthenticationFailed {
                        message: "session rejected again after re-login".into(),
                    }),
                    other => other.map_err(CoreError::from),
                }
            }
            other => other.map_err(CoreError::from),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.detach_publisher();
    }
}
