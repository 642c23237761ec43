#![allow(missing_docs)]
//! Integration tests: both transport variants produce the same response shape.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use king_transport::{
    BridgeRequest, BridgeResponse, BridgeRetryPolicy, BridgeTransport, DirectTransport,
    HostBridge, HttpMethod, HttpRequest, NativeHttpBridge, Transport, TransportError,
};
use serde_json::{Value, json};

async fn handle_echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "success": true, "echo": body, "contentType": content_type }))
}

async fn handle_missing() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "class not found" })),
    )
}

async fn spawn_mock_backend() -> Result<Option<String>> {
    let app = Router::new()
        .route("/echo", post(handle_echo))
        .route("/missing", get(handle_missing));
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping transport tests: local socket bind is not permitted");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Some(format!("http://{addr}")))
}

#[tokio::test]
async fn direct_transport_posts_json_and_reads_response() -> Result<()> {
    let Some(base_url) = spawn_mock_backend().await? else {
        return Ok(());
    };
    let transport = DirectTransport::new();
    let response = transport
        .execute(HttpRequest::post_json(
            format!("{base_url}/echo"),
            &json!({ "className": "Widget" }),
        ))
        .await?;
    assert_eq!(response.status(), 200);
    assert!(response.is_success());
    assert_eq!(response.status_text(), "OK");
    assert!(response.header("Content-Type").is_some());
    let body = response.json()?;
    assert_eq!(body["echo"]["className"], json!("Widget"));
    assert_eq!(body["contentType"], json!("application/json"));
    Ok(())
}

#[tokio::test]
async fn direct_transport_returns_non_success_status_without_error() -> Result<()> {
    let Some(base_url) = spawn_mock_backend().await? else {
        return Ok(());
    };
    let response = DirectTransport::new()
        .execute(HttpRequest::get(format!("{base_url}/missing")))
        .await?;
    assert_eq!(response.status(), 404);
    assert_eq!(response.json()?["message"], json!("class not found"));
    Ok(())
}

#[tokio::test]
async fn direct_transport_reports_unreachable_host() {
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    let err = DirectTransport::new()
        .execute(HttpRequest::get("http://127.0.0.1:9/objects/query"))
        .await
        .expect_err("expected network failure");
    assert!(matches!(err, TransportError::Network { .. }), "got {err:?}");
}

#[tokio::test]
async fn native_bridge_matches_direct_transport() -> Result<()> {
    let Some(base_url) = spawn_mock_backend().await? else {
        return Ok(());
    };
    let request = HttpRequest::post_json(format!("{base_url}/echo"), &json!({ "limit": 100 }));
    let direct = DirectTransport::new().execute(request.clone()).await?;
    let bridged = BridgeTransport::new(Arc::new(NativeHttpBridge::default()))
        .execute(request)
        .await?;
    assert_eq!(direct.status(), bridged.status());
    assert_eq!(direct.status_text(), bridged.status_text());
    assert_eq!(direct.json()?, bridged.json()?);
    Ok(())
}

#[tokio::test]
async fn native_bridge_rejects_unsupported_method() {
    let bridge = NativeHttpBridge::default();
    let err = bridge
        .http_request(BridgeRequest {
            url: "http://127.0.0.1:9/".to_string(),
            method: "TRACE".to_string(),
            headers: None,
            body: None,
        })
        .await
        .expect_err("expected rejection");
    assert!(err.contains("Unsupported method"), "got {err}");
}

#[tokio::test]
async fn native_bridge_gives_up_after_configured_attempts() {
    let bridge = NativeHttpBridge::new(BridgeRetryPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
    });
    let err = bridge
        .http_request(BridgeRequest {
            url: "http://127.0.0.1:9/objects/query".to_string(),
            method: "GET".to_string(),
            headers: None,
            body: None,
        })
        .await
        .expect_err("expected failure");
    assert!(err.contains("Request failed"), "got {err}");
}

/// Records what the adapter hands to the host and replies with a canned result.
struct RecordingBridge {
    seen: Mutex<Vec<BridgeRequest>>,
    reply: Result<BridgeResponse, String>,
}

#[async_trait]
impl HostBridge for RecordingBridge {
    async fn http_request(&self, request: BridgeRequest) -> Result<BridgeResponse, String> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request);
        }
        self.reply.clone()
    }
}

#[tokio::test]
async fn bridge_transport_wraps_structured_result() -> Result<()> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    let bridge = Arc::new(RecordingBridge {
        seen: Mutex::new(Vec::new()),
        reply: Ok(BridgeResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers,
            body: r#"{"success":true,"data":{"objects":[]}}"#.to_string(),
        }),
    });
    let transport = BridgeTransport::new(bridge.clone());
    let response = transport
        .execute(HttpRequest::post_json(
            "http://127.0.0.1:5175/objects/search",
            &json!({ "className": "Widget" }),
        ))
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.json()?["success"], json!(true));

    let seen = bridge.seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, HttpMethod::Post.to_string());
    assert_eq!(seen[0].url, "http://127.0.0.1:5175/objects/search");
    assert!(seen[0].body.as_deref().is_some_and(|b| b.contains("Widget")));
    Ok(())
}

#[tokio::test]
async fn bridge_failure_is_a_rejected_operation() {
    let bridge = Arc::new(RecordingBridge {
        seen: Mutex::new(Vec::new()),
        reply: Err("connection refused".to_string()),
    });
    let err = BridgeTransport::new(bridge)
        .execute(HttpRequest::get("http://127.0.0.1:5175/connection/list"))
        .await
        .expect_err("expected bridge failure");
    assert_eq!(err, TransportError::Bridge("connection refused".to_string()));
}
