//! Health endpoint integration tests.
//!
//! Tests `/health`, `/ready` and `/metrics` using the `TestGatewayServer` harness.

use pool_gateway::provider::mock::ScriptedProvider;
use pool_test_utils::TestGatewayServer;
use std::sync::Arc;

async fn spawn() -> Result<TestGatewayServer, anyhow::Error> {
    TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await
}

/// Test that health endpoint returns 200 and healthy status.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["region"], "test-region");

    Ok(())
}

/// Test that health endpoint returns JSON content type.
#[tokio::test]
async fn test_health_endpoint_returns_json() -> Result<(), anyhow::Error> {
    let server = spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    Ok(())
}

/// Health never touches the provider.
#[tokio::test]
async fn test_health_does_not_call_provider() -> Result<(), anyhow::Error> {
    let server = spawn().await?;

    reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(server.provider().call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_ready_reports_key_count() -> Result<(), anyhow::Error> {
    let server = spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["verification_keys"], 1);

    Ok(())
}

#[tokio::test]
async fn test_ready_returns_503_while_draining() -> Result<(), anyhow::Error> {
    let server = spawn().await?;
    server.begin_drain();

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "draining");

    // Liveness is unaffected
    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/nonexistent", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = spawn().await?;

    // Generate at least one recorded request
    reqwest::get(format!("{}/health", server.url())).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
