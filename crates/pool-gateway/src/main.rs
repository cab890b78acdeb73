//! Pool Gateway
//!
//! HTTP gateway in front of a managed user pool. Verifies bearer tokens
//! against the pool's published keys and exposes user, group and
//! membership operations.

use pool_gateway::auth::TokenVerifier;
use pool_gateway::config::Config;
use pool_gateway::jwks::JwksClient;
use pool_gateway::provider::CognitoProvider;
use pool_gateway::routes::{self, AppState};
use pool_gateway::services::DirectoryService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pool_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pool Gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        pool_id = %config.pool_id,
        region = %config.region,
        bind_address = %config.bind_address,
        backoff_steps = config.backoff_schedule.len(),
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    // Must happen before any metric is recorded
    let metrics_handle = routes::init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Verification keys are resolved once; the service does not start without them
    info!(jwks_url = %config.jwks_url, "Resolving token verification keys...");
    let jwks_client = JwksClient::new(config.jwks_url.clone(), config.provider_timeout);
    let keys = jwks_client.resolve().await.map_err(|e| {
        error!("Failed to resolve verification keys: {}", e);
        e
    })?;

    let verifier = TokenVerifier::new(
        &keys,
        &config.token_issuer,
        config.jwt_clock_skew_seconds,
    )
    .map_err(|e| {
        error!("Failed to load verification keys: {}", e);
        e
    })?;

    let provider = CognitoProvider::from_config(&config).await;
    let directory = DirectoryService::new(
        Arc::new(provider),
        config.pool_id.clone(),
        config.backoff_schedule.clone(),
    );

    let bind_address = config.bind_address.clone();
    let drain_period = config.drain_period;
    let draining = CancellationToken::new();
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        config,
        directory: Arc::new(directory),
        verifier: Arc::new(verifier),
        draining: draining.clone(),
        shutdown: shutdown.clone(),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Pool Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(draining, shutdown, drain_period))
    .await?;

    info!("Pool Gateway shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
///
/// On a signal, cancels `draining` so readiness fails while requests are
/// still served, waits out `drain_period`, then cancels `shutdown` so
/// listings still running stop before axum closes connections.
async fn shutdown_signal(
    draining: CancellationToken,
    shutdown: CancellationToken,
    drain_period: Duration,
) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    draining.cancel();

    if drain_period.is_zero() {
        info!("Skipping drain period");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }

    shutdown.cancel();
}
