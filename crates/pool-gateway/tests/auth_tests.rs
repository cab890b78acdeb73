//! Authentication integration tests.
//!
//! Tests token verification on protected endpoints using the fixed test key.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use chrono::Utc;
use pool_gateway::provider::mock::ScriptedProvider;
use pool_test_utils::{
    sign_with, TestGatewayServer, TestTokenBuilder, FOREIGN_PRIVATE_KEY_PEM, TEST_KID,
    TEST_PRIVATE_KEY_PEM,
};
use std::sync::Arc;

async fn spawn() -> Result<TestGatewayServer> {
    TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await
}

async fn get_me(server: &TestGatewayServer, token: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .bearer_auth(token)
        .send()
        .await?)
}

async fn assert_unauthorized(response: reqwest::Response) -> Result<()> {
    assert_eq!(response.status(), 401);

    let www_auth = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(www_auth.starts_with("Bearer"), "got {www_auth:?}");

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn test_valid_token_returns_claims() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new()
        .for_user("alice")
        .in_group("staff")
        .sign();

    let response = get_me(&server, &token).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["groups"][0], "staff");
    assert_eq!(body["token_use"], "access");

    Ok(())
}

#[tokio::test]
async fn test_id_token_is_accepted() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new().with_token_use("id").sign();

    let response = get_me(&server, &token).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_missing_authorization_header() -> Result<()> {
    let server = spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/me", server.url())).await?;

    assert_unauthorized(response).await
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() -> Result<()> {
    let server = spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_unauthorized(response).await
}

#[tokio::test]
async fn test_expired_token_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new()
        .issued_at(Utc::now().timestamp() - 7200)
        .expires_in(-3600)
        .sign();

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_token_within_clock_skew_is_accepted() -> Result<()> {
    let server = spawn().await?;
    // Default skew is 60 seconds
    let token = TestTokenBuilder::new().expires_in(-10).sign();

    let response = get_me(&server, &token).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_future_iat_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new()
        .issued_at(Utc::now().timestamp() + 3600)
        .expires_in(7200)
        .sign();

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new()
        .with_issuer("https://cognito-idp.us-east-1.amazonaws.com/us-east-1_Other")
        .sign();

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_unexpected_token_use_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new().with_token_use("refresh").sign();

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_unknown_kid_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let claims = TestTokenBuilder::new().build();
    let token = sign_with(TEST_PRIVATE_KEY_PEM, "rotated-away", &claims);

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_signature_from_unpublished_key_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let claims = TestTokenBuilder::new().build();
    let token = sign_with(FOREIGN_PRIVATE_KEY_PEM, TEST_KID, &claims);

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = TestTokenBuilder::new().for_user("alice").sign();
    let other = TestTokenBuilder::new().for_user("mallory").sign();

    // Header and signature from one token, payload from another
    let parts: Vec<&str> = token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

    assert_unauthorized(get_me(&server, &forged).await?).await
}

#[tokio::test]
async fn test_oversized_token_is_rejected() -> Result<()> {
    let server = spawn().await?;
    let token = "a".repeat(pool_gateway::auth::jwt::MAX_JWT_SIZE_BYTES + 1);

    assert_unauthorized(get_me(&server, &token).await?).await
}

#[tokio::test]
async fn test_protected_listing_requires_auth() -> Result<()> {
    let server = spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/groups", server.url())).await?;
    assert_eq!(response.status(), 401);

    // Rejected before the provider is reached
    assert_eq!(server.provider().call_count(), 0);

    Ok(())
}
