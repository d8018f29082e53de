//! REST surface tests driven through the router without binding a socket.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use twitch_relay::app_state::AppState;
use twitch_relay::config::RelayConfig;
use twitch_relay::domain::{ConnectionState, Credentials, Session, SessionId, TenantId};
use twitch_relay::server::{build_app, build_state};
use twitch_relay::transport::{Connector, TransportEvent, TransportHandle};

/// Connector that reports success immediately and then idles.
#[derive(Debug, Default)]
struct InstantConnector;

impl Connector for InstantConnector {
    fn open(
        &self,
        _credentials: Credentials,
        events: mpsc::Sender<TransportEvent>,
    ) -> TransportHandle {
        TransportHandle::spawn(async move {
            let _ = events.send(TransportEvent::Connected).await;
            std::future::pending::<()>().await;
        })
    }
}

fn state() -> AppState {
    build_state(&RelayConfig::default(), Arc::new(InstantConnector))
}

fn tenant(name: &str) -> TenantId {
    let Ok(id) = TenantId::parse(name) else {
        panic!("valid tenant");
    };
    id
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Vec<u8>) {
    call(state, Request::get(uri)).await
}

async fn call(state: &AppState, builder: axum::http::request::Builder) -> (StatusCode, Vec<u8>) {
    let app = build_app(state.clone(), Duration::from_secs(5));
    let Ok(request) = builder.body(Body::empty()) else {
        panic!("valid request");
    };
    let Ok(response) = app.oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    (status, bytes.to_vec())
}

fn json(bytes: &[u8]) -> serde_json::Value {
    let Ok(value) = serde_json::from_slice(bytes) else {
        panic!("response is not JSON: {}", String::from_utf8_lossy(bytes));
    };
    value
}

/// Connects `name` through a registered viewer session. The session must be
/// held for as long as the tenant should count it.
async fn connected_tenant(state: &AppState, name: &str) -> Session {
    let Ok(broadcaster) = state.registry.get_or_create(&tenant(name)).await else {
        panic!("create failed");
    };
    let session = broadcaster.register_session(SessionId::new());
    let result = broadcaster
        .handle_connect_command(session.id(), Credentials::new("bot", "tok", name))
        .await;
    assert!(result.is_ok());
    for _ in 0..50 {
        if broadcaster.state().await == ConnectionState::Connected {
            return session;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tenant never connected");
}

#[tokio::test]
async fn ping_returns_pong() {
    let (status, body) = get(&state(), "/ping/pong").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"PONG");
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = get(&state(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value.get("status").and_then(|s| s.as_str()), Some("healthy"));
    assert!(value.get("version").is_some());
    assert_eq!(value.get("tenants").and_then(|t| t.as_u64()), Some(0));
}

#[tokio::test]
async fn channel_list_starts_empty() {
    let (status, body) = get(&state(), "/api/v1/channels").await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value.get("total").and_then(|t| t.as_u64()), Some(0));
}

#[tokio::test]
async fn channel_list_reports_connected_tenant() {
    let state = state();
    let _viewer = connected_tenant(&state, "alpha").await;

    let (status, body) = get(&state, "/api/v1/channels").await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value.get("total").and_then(|t| t.as_u64()), Some(1));
    let first = value
        .get("channels")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .cloned()
        .unwrap_or_default();
    assert_eq!(first.get("tenant").and_then(|t| t.as_str()), Some("alpha"));
    assert_eq!(first.get("state").and_then(|s| s.as_str()), Some("connected"));
    assert_eq!(first.get("session_count").and_then(|s| s.as_u64()), Some(1));
}

#[tokio::test]
async fn unknown_channel_is_404() {
    let (status, body) = get(&state(), "/api/v1/channels/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let value = json(&body);
    let code = value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_u64());
    assert_eq!(code, Some(2001));
}

#[tokio::test]
async fn invalid_tenant_is_400() {
    let (status, body) = get(&state(), "/api/v1/channels/bad-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let code = json(&body)
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_u64());
    assert_eq!(code, Some(1001));
}

#[tokio::test]
async fn disconnect_is_idempotent_over_rest() {
    let state = state();
    let _viewer = connected_tenant(&state, "beta").await;

    let (status, body) = call(&state, Request::post("/api/v1/channels/beta/disconnect")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body).get("was_connected").and_then(|w| w.as_bool()),
        Some(true)
    );
    assert_eq!(
        json(&body).get("released").and_then(|r| r.as_bool()),
        Some(false)
    );

    let (status, body) = call(&state, Request::post("/api/v1/channels/beta/disconnect")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body).get("was_connected").and_then(|w| w.as_bool()),
        Some(false)
    );

    let (_, body) = get(&state, "/api/v1/channels/beta").await;
    assert_eq!(
        json(&body).get("state").and_then(|s| s.as_str()),
        Some("disconnected")
    );
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = get(&state(), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert!(value.get("paths").and_then(|p| p.get("/ping/pong")).is_some());
}

#[tokio::test]
async fn tenant_limit_rejects_new_sockets() {
    let config = RelayConfig {
        max_tenants: 1,
        ..RelayConfig::default()
    };
    let state = build_state(&config, Arc::new(InstantConnector));
    let (_, _viewer) = tokio_test::assert_ok!(state.registry.join(&tenant("one"), SessionId::new()).await);
    tokio_test::assert_err!(state.registry.get_or_create(&tenant("two")).await);
}

#[tokio::test]
async fn disconnect_without_viewers_releases_tenant() {
    let state = state();
    let viewer = connected_tenant(&state, "gamma").await;
    drop(viewer);

    let (status, body) = call(&state, Request::post("/api/v1/channels/gamma/disconnect")).await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value.get("was_connected").and_then(|w| w.as_bool()), Some(true));
    assert_eq!(value.get("released").and_then(|r| r.as_bool()), Some(true));

    let (status, _) = get(&state, "/api/v1/channels/gamma").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
