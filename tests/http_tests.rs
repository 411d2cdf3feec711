// HTTP control API over mock pipelines

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{services, MockAnalytics, MockConnector, MockDirectory, ScriptedInference};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tower::ServiceExt;
use voice_call_agent::http::{create_router, AppState, CallLauncher};
use voice_call_agent::monitor::MonitorConfig;

fn app() -> (Router, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::default());
    let launcher = CallLauncher::new(
        connector.clone(),
        services(
            Arc::new(MockDirectory::caller_first()),
            Arc::new(ScriptedInference::replying(common::NOT_SURE_CLASSIFICATION)),
            Arc::new(MockAnalytics::default()),
        ),
        MonitorConfig::default(),
    );

    (create_router(AppState::new(launcher)), connector)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Ok((status, value))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (app, _) = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"OK");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_call_lifecycle() -> Result<()> {
    let (app, connector) = app();

    let (status, body) = send(&app, "POST", "/calls", Some(json!({ "call_id": "room-7" }))).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["call_id"], "room-7");
    assert_eq!(body["status"], "connecting");

    sleep(Duration::from_secs(1)).await;
    connector.pipeline("room-7").expect("pipeline opened").user_says("Hello");
    sleep(Duration::from_millis(10)).await;

    let (status, stats) = send(&app, "GET", "/calls/room-7/status", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["state"], "active");
    assert_eq!(stats["conversation_items"], 1);

    let (status, calls) = send(&app, "GET", "/calls", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "POST", "/calls/room-7/end", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(connector.pipeline("room-7").map(|p| p.shutdown_count()), Some(1));

    // Finished sessions leave the registry
    sleep(Duration::from_millis(100)).await;
    let (status, _) = send(&app, "GET", "/calls/room-7/status", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_call_is_rejected() -> Result<()> {
    let (app, _) = app();

    let (status, _) = send(&app, "POST", "/calls", Some(json!({ "call_id": "room-9" }))).await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, "POST", "/calls", Some(json!({ "call_id": "room-9" }))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap_or_default().contains("room-9"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_generated_call_id() -> Result<()> {
    let (app, connector) = app();

    let (status, body) = send(&app, "POST", "/calls", Some(json!({}))).await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let call_id = body["call_id"].as_str().unwrap_or_default().to_string();
    assert!(call_id.starts_with("call-"));
    assert!(connector.pipeline(&call_id).is_some());
    Ok(())
}

#[tokio::test]
async fn test_unknown_call() -> Result<()> {
    let (app, _) = app();

    let (status, body) = send(&app, "GET", "/calls/missing/status", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Call missing not found");

    let (status, _) = send(&app, "POST", "/calls/missing/end", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, calls) = send(&app, "GET", "/calls", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls, json!([]));
    Ok(())
}
