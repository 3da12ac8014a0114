use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use runpod_worker::http::{
    AsyncSession, CredentialChain, CredentialStore, Credentials, HttpError, StoreSource,
    SyncSession, USER_AGENT,
};

/// Store whose key can be rotated mid-test
#[derive(Default)]
struct RotatingStore {
    key: Mutex<Option<String>>,
}

impl RotatingStore {
    fn rotate(&self, key: &str) {
        *self.key.lock().unwrap() = Some(key.to_string());
    }
}

impl CredentialStore for RotatingStore {
    fn get_credentials(&self) -> Option<Credentials> {
        self.key
            .lock()
            .unwrap()
            .as_ref()
            .map(|key| Credentials::new().with_api_key(key.clone()))
    }
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
        .collect();
    Json(json!(headers))
}

async fn echo_body(body: String) -> impl IntoResponse {
    (StatusCode::CREATED, body)
}

async fn rate_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/headers", get(echo_headers))
        .route("/echo", post(echo_body))
        .route("/limited", get(rate_limited));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

fn chain_for(store: Arc<RotatingStore>) -> CredentialChain {
    CredentialChain::new().with_source(StoreSource::new(store))
}

#[tokio::test]
async fn test_async_session_sends_auth_headers() {
    let address = spawn_server().await;
    let store = Arc::new(RotatingStore::default());
    store.rotate("rp_first");

    let session = AsyncSession::new(&chain_for(store)).unwrap();
    let response = session
        .execute(session.get(format!("http://{address}/headers")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers: Value = response.json().unwrap();
    assert_eq!(headers["authorization"], "rp_first");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["user-agent"], USER_AGENT.as_str());
}

#[tokio::test]
async fn test_rotated_key_only_reaches_new_sessions() {
    let address = spawn_server().await;
    let store = Arc::new(RotatingStore::default());
    store.rotate("rp_old");
    let chain = chain_for(store.clone());

    let old_session = AsyncSession::new(&chain).unwrap();
    store.rotate("rp_new");
    let new_session = AsyncSession::new(&chain).unwrap();

    let url = format!("http://{address}/headers");
    let old: Value = old_session
        .execute(old_session.get(&url))
        .await
        .unwrap()
        .json()
        .unwrap();
    let new: Value = new_session
        .execute(new_session.get(&url))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(old["authorization"], "rp_old");
    assert_eq!(new["authorization"], "rp_new");
}

#[tokio::test]
async fn test_missing_credentials_send_empty_authorization() {
    let address = spawn_server().await;
    let session = AsyncSession::new(&CredentialChain::new()).unwrap();

    let headers: Value = session
        .execute(session.get(format!("http://{address}/headers")))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(headers["authorization"], "");
}

#[tokio::test]
async fn test_request_body_round_trip() {
    let address = spawn_server().await;
    let session = AsyncSession::new(&CredentialChain::new()).unwrap();

    let response = session
        .execute(
            session
                .post(format!("http://{address}/echo"))
                .body(r#"{"input":{"prompt":"hello"}}"#),
        )
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.text(), r#"{"input":{"prompt":"hello"}}"#);
}

#[tokio::test]
async fn test_429_surfaces_as_too_many_requests() {
    let address = spawn_server().await;
    let session = AsyncSession::new(&CredentialChain::new()).unwrap();

    let response = session
        .execute(session.get(format!("http://{address}/limited")))
        .await
        .unwrap();
    let err = response.error_for_status().unwrap_err();

    assert!(err.is_too_many_requests());
    assert!(matches!(err, HttpError::TooManyRequests { ref message, .. } if message == "slow down"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let session = AsyncSession::new(&CredentialChain::new()).unwrap();
    let err = session
        .execute(session.get(format!("http://{address}/headers")))
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_session_sends_same_headers() {
    let address = spawn_server().await;
    let store = Arc::new(RotatingStore::default());
    store.rotate("rp_sync");
    let chain = chain_for(store);

    let headers: Value = tokio::task::spawn_blocking(move || {
        let session = SyncSession::new(&chain).unwrap();
        session
            .execute(session.get(format!("http://{address}/headers")))
            .unwrap()
            .json()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(headers["authorization"], "rp_sync");
    assert_eq!(headers["user-agent"], USER_AGENT.as_str());
}
