// bluestar-api: Async Rust client for the Bluestar Smart AC cloud (REST + shadow broker)

pub mod auth;
pub mod broker;
pub mod client;
pub mod credentials;
pub mod error;
pub mod models;
pub mod things;
pub mod transport;

pub use auth::{Account, RetryPolicy, Session};
pub use broker::{BrokerConfig, BrokerPublisher, BrokerState, ShadowPublisher};
pub use client::BluestarClient;
pub use credentials::BrokerCredentials;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
