#![allow(clippy::unwrap_used)]
// Integration tests for `BluestarClient` using wiremock.

use std::time::{Duration, Instant};

use base64::Engine;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bluestar_api::models::{ControlPayload, ModeValue, PreferencesUpdate, ShadowUpdate, Temperature};
use bluestar_api::{Account, BluestarClient, Error, RetryPolicy, Session, TransportConfig};

const PHONE: &str = "9876543210";

// ── Helpers ─────────────────────────────────────────────────────────

fn account(base: &MockServer) -> Account {
    Account::new(
        PHONE,
        SecretString::from("hunter2"),
        Url::parse(&base.uri()).unwrap(),
    )
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(50),
    }
}

fn client_for(account: Account) -> BluestarClient {
    BluestarClient::new(account, &TransportConfig::default())
        .unwrap()
        .with_retry(fast_retry())
}

async fn setup() -> (MockServer, BluestarClient) {
    let server = MockServer::start().await;
    let client = client_for(account(&server));
    (server, client)
}

fn packed_mi() -> String {
    base64::engine::general_purpose::STANDARD.encode("broker.example.com::AKIA123::s3cr3t")
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "session": token,
        "mi": packed_mi(),
        "user": { "id": "user-1" }
    }))
}

fn session_for(server: &MockServer) -> Session {
    Session::new(
        SecretString::from("tok-1"),
        Url::parse(&server.uri()).unwrap(),
    )
}

fn auth_ids(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["auth_id"].as_str().unwrap().to_owned()
        })
        .collect()
}

// ── Login tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_extracts_session_and_broker() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("x-app-ver", "v4.11.4-133"))
        .and(header("x-os-name", "Android"))
        .and(header("user-agent", "com.bluestarindia.bluesmart"))
        .and(body_json(json!({
            "auth_id": PHONE,
            "auth_type": 1,
            "password": "hunter2"
        })))
        .respond_with(login_ok("tok-1"))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.login().await.unwrap();

    assert_eq!(session.token().expose_secret(), "tok-1");
    assert_eq!(session.auth_id, PHONE);
    assert_eq!(session.user_id.as_deref(), Some("user-1"));
    assert_eq!(session.base_url.as_str(), Url::parse(&server.uri()).unwrap().as_str());

    let broker = session.broker.expect("broker credentials");
    assert_eq!(broker.endpoint, "broker.example.com");
    assert_eq!(broker.client_id(), "u-tok-1");
}

#[tokio::test]
async fn test_login_retries_transient_failures_with_backoff() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(login_ok("tok-3"))
        .expect(1)
        .mount(&server)
        .await;

    let started = Instant::now();
    let session = client.login().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(session.token().expose_secret(), "tok-3");
    // 50ms then 100ms between the three attempts, all on the raw format.
    assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(auth_ids(&requests), vec![PHONE, PHONE, PHONE]);
}

#[tokio::test]
async fn test_login_walks_every_format_and_host_before_failing() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(3)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("locked"))
        .expect(3)
        .mount(&fallback)
        .await;

    let acct = account(&primary).with_fallbacks(vec![Url::parse(&fallback.uri()).unwrap()]);
    let result = client_for(acct).login().await;

    match result {
        Err(Error::Authentication { status, .. }) => assert_eq!(status, Some(403)),
        other => panic!("expected Authentication error, got: {other:?}"),
    }

    let expected = vec![
        PHONE.to_owned(),
        format!("91{PHONE}"),
        format!("+91{PHONE}"),
    ];
    assert_eq!(auth_ids(&primary.received_requests().await.unwrap()), expected);
    assert_eq!(auth_ids(&fallback.received_requests().await.unwrap()), expected);
}

#[tokio::test]
async fn test_login_session_sticks_to_accepting_host() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({ "auth_id": format!("91{PHONE}") })))
        .respond_with(login_ok("tok-b"))
        .mount(&fallback)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&fallback)
        .await;

    let fallback_url = Url::parse(&fallback.uri()).unwrap();
    let acct = account(&primary).with_fallbacks(vec![fallback_url.clone()]);
    let session = client_for(acct).login().await.unwrap();

    assert_eq!(session.base_url, fallback_url);
    assert_eq!(session.auth_id, format!("91{PHONE}"));
}

#[tokio::test]
async fn test_login_without_token_moves_to_next_format() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({ "auth_id": PHONE })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": {} })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session": "tok-2" })))
        .mount(&server)
        .await;

    let session = client.login().await.unwrap();
    assert_eq!(session.token().expose_secret(), "tok-2");
    assert!(session.broker.is_none());
}

#[tokio::test]
async fn test_login_with_malformed_broker_credentials_still_succeeds() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session": "tok-1",
            "mi": "not base64 at all"
        })))
        .mount(&server)
        .await;

    let session = client.login().await.unwrap();
    assert!(session.broker.is_none());
}

// ── Device tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_things_sends_session_header() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("x-app-session", "tok-1"))
        .and(header("x-os-ver", "v13-33"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "things": [{ "thing_id": "ac-1", "user_config": { "name": "Bedroom" } }],
            "states": { "ac-1": {
                "state": { "pow": 1, "mode": 2, "stemp": "24", "ctemp": 27.5 },
                "connected": true,
                "timestamp": 1_700_000_000_000_i64
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let things = client.list_things(&session_for(&server)).await.unwrap();

    assert_eq!(things.things.len(), 1);
    assert_eq!(things.things[0].user_config.name.as_deref(), Some("Bedroom"));
    let state = &things.states["ac-1"];
    assert_eq!(state.connected, Some(true));
    assert_eq!(state.state.stemp.as_ref().and_then(Temperature::celsius), Some(24.0));
}

#[tokio::test]
async fn test_expired_session_maps_to_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_things(&session_for(&server)).await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
}

#[tokio::test]
async fn test_gateway_errors_are_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.list_things(&session_for(&server)).await.unwrap_err();
    assert!(matches!(err, Error::TransientBackend { status: 503 }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_update_preferences_posts_mode_scoped_strings() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/ac-1/preferences"))
        .and(header("x-app-session", "tok-1"))
        .and(body_json(json!({
            "preferences": { "mode": { "1": { "power": "1", "mode": "1", "stemp": "22.0" } } }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut payload = ControlPayload::new(1);
    payload.pow = Some(1);
    payload.mode = Some(ModeValue { value: 1 });
    payload.stemp = Some("22.0".into());
    let update = PreferencesUpdate::for_mode(1, &payload);

    let body = client
        .update_preferences(&session_for(&server), "ac-1", &update)
        .await
        .unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_update_state_wraps_desired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/ac-1/state"))
        .and(body_json(json!({
            "state": { "desired": { "fspd": 3, "ts": 7, "src": "anmq" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut payload = ControlPayload::new(7);
    payload.fspd = Some(3);

    client
        .update_state(&session_for(&server), "ac-1", &ShadowUpdate::desired(payload))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_force_fetch_posts_control_marker() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/ac-1/control"))
        .and(body_json(json!({ "fpsh": 1 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .force_fetch(&session_for(&server), "ac-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_device_id_is_one_encoded_segment() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/ac%2F1%3Fx/control"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .force_fetch(&session_for(&server), "ac/1?x")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_control_maps_to_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/ac-1/state"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .update_state(
            &session_for(&server),
            "ac-1",
            &ShadowUpdate::desired(ControlPayload::new(1)),
        )
        .await
        .unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
