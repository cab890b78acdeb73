//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests,
//! backed by a [`ScriptedProvider`] and the fixed test signing key.

use crate::crypto_fixtures::{resolved_keys, TEST_ISSUER};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pool_gateway::auth::TokenVerifier;
use pool_gateway::config::Config;
use pool_gateway::provider::mock::ScriptedProvider;
use pool_gateway::routes::{self, init_metrics_recorder, AppState};
use pool_gateway::services::DirectoryService;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Shared Prometheus handle; the global recorder can only be installed once.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    provider: Arc<ScriptedProvider>,
    draining: CancellationToken,
    shutdown: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a server with millisecond backoff delays.
    pub async fn spawn(provider: Arc<ScriptedProvider>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(provider, HashMap::new()).await
    }

    /// Spawn a server, overriding configuration variables with `overrides`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Trust tokens signed by the primary test key
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        provider: Arc<ScriptedProvider>,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("USER_POOL_ID".to_string(), "us-east-1_TestPool".to_string()),
            ("POOL_REGION".to_string(), "test-region".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("TOKEN_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("BACKOFF_SCHEDULE_MS".to_string(), "5,10,20".to_string()),
            ("ADMIN_GROUP".to_string(), "admin".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let verifier = TokenVerifier::new(
            &resolved_keys(),
            &config.token_issuer,
            config.jwt_clock_skew_seconds,
        )
        .map_err(|e| anyhow::anyhow!("Failed to load test keys: {}", e))?;

        let directory = DirectoryService::new(
            provider.clone(),
            config.pool_id.clone(),
            config.backoff_schedule.clone(),
        );

        let draining = CancellationToken::new();
        let shutdown = CancellationToken::new();
        let state = Arc::new(AppState {
            config: config.clone(),
            directory: Arc::new(directory),
            verifier: Arc::new(verifier),
            draining: draining.clone(),
            shutdown: shutdown.clone(),
        });

        // Build routes using the gateway's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            provider,
            draining,
            shutdown,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The provider backing this server.
    pub fn provider(&self) -> &ScriptedProvider {
        &self.provider
    }

    /// Enter the drain period: readiness reports draining, requests are
    /// still served.
    pub fn begin_drain(&self) {
        self.draining.cancel();
    }

    /// End the drain period: listings still running are cancelled.
    pub fn finish_drain(&self) {
        self.draining.cancel();
        self.shutdown.cancel();
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["region"], "test-region");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_config_access() -> Result<(), anyhow::Error> {
        let overrides = HashMap::from([("ADMIN_GROUP".to_string(), "operators".to_string())]);
        let server =
            TestGatewayServer::spawn_with_vars(Arc::new(ScriptedProvider::new()), overrides)
                .await?;

        assert_eq!(server.config().admin_group, "operators");
        assert_eq!(server.config().backoff_schedule.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let server1 = TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await?;
        let server2 = TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await?;

        assert_ne!(server1.addr(), server2.addr());

        Ok(())
    }
}
