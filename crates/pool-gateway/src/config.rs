//! Pool Gateway configuration.
//!
//! Configuration is loaded from environment variables once in `main` and
//! passed down. The gateway holds no secrets: AWS credentials come from the
//! default provider chain.

use crate::jwks::discovery_url;
use crate::listing::DEFAULT_BACKOFF;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default provider region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Largest page the user-pool list APIs accept.
pub const MAX_PAGE_SIZE: i32 = 60;

/// Default per-call timeout for provider and JWKS requests.
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the per-call timeout.
pub const MAX_PROVIDER_TIMEOUT_SECONDS: u64 = 120;

/// Longest single backoff delay accepted.
pub const MAX_BACKOFF_DELAY_MS: u64 = 60_000;

/// Upper bound on a single HTTP request, including listing backoff.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default JWT clock skew tolerance.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 60;

/// Upper bound for JWT clock skew tolerance.
pub const MAX_CLOCK_SKEW_SECONDS: u64 = 600;

/// Default group allowed to change memberships.
pub const DEFAULT_ADMIN_GROUP: &str = "admin";

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Pool Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// User pool identifier (e.g., "us-east-1_AbCdEfGhI").
    pub pool_id: String,

    /// Provider region (default: "us-east-1").
    pub region: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Key set URL. Derived from region and pool id unless overridden.
    pub jwks_url: String,

    /// Expected `iss` claim. Derived from region and pool id unless overridden.
    pub token_issuer: String,

    /// Backoff delays for throttled page calls.
    pub backoff_schedule: Vec<Duration>,

    /// Page size requested from list APIs (1..=60).
    pub page_size: i32,

    /// Per-call timeout for provider and JWKS requests.
    pub provider_timeout: Duration,

    /// Provider endpoint override for local emulators.
    pub provider_endpoint_url: Option<String>,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: u64,

    /// Group whose members may add and remove memberships.
    pub admin_group: String,

    /// How long in-flight requests may run after a shutdown signal.
    pub drain_period: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid backoff schedule: {0}")]
    InvalidBackoffSchedule(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(String),

    #[error("Invalid provider timeout: {0}")]
    InvalidProviderTimeout(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainPeriod(String),
}

/// Parse `name` as an integer in `min..=max`, or return `default` when unset.
fn parse_bounded<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    min: T,
    max: T,
    error: fn(String) -> ConfigError,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = value_str.trim().parse().map_err(|e| {
        error(format!(
            "{name} must be a valid integer, got '{value_str}': {e}"
        ))
    })?;

    if value < min || value > max {
        return Err(error(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }

    Ok(value)
}

/// Parse a comma-separated list of millisecond delays.
///
/// An empty value disables retries. The delays together must stay below
/// [`REQUEST_TIMEOUT`], otherwise an exhausted schedule would surface as a
/// request timeout instead of a throttling error.
fn parse_backoff_schedule(value: &str) -> Result<Vec<Duration>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    let delays = value
        .split(',')
        .map(|part| {
            let part = part.trim();
            let ms: u64 = part.parse().map_err(|e| {
                ConfigError::InvalidBackoffSchedule(format!(
                    "BACKOFF_SCHEDULE_MS entries must be integers, got '{part}': {e}"
                ))
            })?;
            if ms > MAX_BACKOFF_DELAY_MS {
                return Err(ConfigError::InvalidBackoffSchedule(format!(
                    "BACKOFF_SCHEDULE_MS entries must not exceed {MAX_BACKOFF_DELAY_MS}, got {ms}"
                )));
            }
            Ok(Duration::from_millis(ms))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total: Duration = delays.iter().sum();
    if total >= REQUEST_TIMEOUT {
        return Err(ConfigError::InvalidBackoffSchedule(format!(
            "BACKOFF_SCHEDULE_MS delays total {}ms, must be below the {}s request timeout",
            total.as_millis(),
            REQUEST_TIMEOUT.as_secs()
        )));
    }

    Ok(delays)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let pool_id = vars
            .get("USER_POOL_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("USER_POOL_ID".to_string()))?;

        let region = vars
            .get("POOL_REGION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| discovery_url(&region, &pool_id));

        let token_issuer = vars
            .get("TOKEN_ISSUER")
            .cloned()
            .unwrap_or_else(|| format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}"));

        let backoff_schedule = match vars.get("BACKOFF_SCHEDULE_MS") {
            Some(value) => parse_backoff_schedule(value)?,
            None => DEFAULT_BACKOFF.to_vec(),
        };

        let page_size = parse_bounded(
            vars,
            "PAGE_SIZE",
            MAX_PAGE_SIZE,
            1,
            MAX_PAGE_SIZE,
            ConfigError::InvalidPageSize,
        )?;

        let provider_timeout = Duration::from_secs(parse_bounded(
            vars,
            "PROVIDER_TIMEOUT_SECONDS",
            DEFAULT_PROVIDER_TIMEOUT_SECONDS,
            1,
            MAX_PROVIDER_TIMEOUT_SECONDS,
            ConfigError::InvalidProviderTimeout,
        )?);

        let provider_endpoint_url = vars
            .get("PROVIDER_ENDPOINT_URL")
            .filter(|v| !v.trim().is_empty())
            .cloned();

        let jwt_clock_skew_seconds = parse_bounded(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW_SECONDS,
            1,
            MAX_CLOCK_SKEW_SECONDS,
            ConfigError::InvalidJwtClockSkew,
        )?;

        let admin_group = vars
            .get("ADMIN_GROUP")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ADMIN_GROUP.to_string());

        let drain_period = Duration::from_secs(parse_bounded(
            vars,
            "DRAIN_SECONDS",
            DEFAULT_DRAIN_SECONDS,
            0,
            3600,
            ConfigError::InvalidDrainPeriod,
        )?);

        Ok(Config {
            pool_id,
            region,
            bind_address,
            jwks_url,
            token_issuer,
            backoff_schedule,
            page_size,
            provider_timeout,
            provider_endpoint_url,
            jwt_clock_skew_seconds,
            admin_group,
            drain_period,
        })
    }
}
