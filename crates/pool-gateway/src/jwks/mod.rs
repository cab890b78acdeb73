//! JWKS resolution for token verification.
//!
//! The user pool publishes its signing keys as a JSON Web Key Set at a
//! discovery URL derived from region and pool id. [`JwksClient::fetch_key_set`]
//! downloads the set once; [`to_public_key_map`] converts every RSA key into
//! a base64-encoded DER `SubjectPublicKeyInfo`, keyed by key id.
//!
//! Conversion is all-or-nothing: the first unusable key aborts and no
//! partial map is produced. Nothing here retries; callers treat a failure
//! at startup as fatal.

pub mod der;

use crate::observability::metrics::record_jwks_fetch;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Key type accepted by the resolver.
const RSA_KEY_TYPE: &str = "RSA";

/// The two base64url spellings of exponent 65537 (`01 00 01`, `00 01 00 01`).
const ACCEPTED_EXPONENTS: [&str; 2] = ["AQAB", "AAEAAQ"];

/// Big-endian bytes of 65537.
const EXPONENT_65537: [u8; 3] = [0x01, 0x00, 0x01];

/// base64url decoder that accepts padded and unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Discovery URL of a Cognito user pool's key set.
pub fn discovery_url(region: &str, pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}/.well-known/jwks.json")
}

/// Errors from fetching or converting a key set.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to fetch key set: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("key set endpoint returned HTTP {0}")]
    Status(u16),

    #[error("key set is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("key {kid}: unsupported key type {kty:?}")]
    UnsupportedKeyType { kid: String, kty: String },

    #[error("key {kid}: cannot decode modulus: {reason}")]
    KeyDecode { kid: String, reason: String },

    #[error("key {kid}: unsupported exponent {exponent:?}")]
    UnsupportedExponent { kid: String, exponent: String },

    #[error("key id {kid} appears more than once")]
    DuplicateKeyId { kid: String },
}

/// JSON Web Key as published by the user pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for user-pool keys).
    pub kty: String,

    /// Key ID - matched against the `kid` header of incoming tokens.
    pub kid: String,

    /// Modulus (base64url, big-endian).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// Public exponent (base64url, big-endian).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Algorithm (normally "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use ("sig").
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Key id to base64-encoded DER `SubjectPublicKeyInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedKeyMap(HashMap<String, String>);

impl ResolvedKeyMap {
    pub fn get(&self, kid: &str) -> Option<&str> {
        self.0.get(kid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(kid, der)| (kid.as_str(), der.as_str()))
    }
}

impl From<HashMap<String, String>> for ResolvedKeyMap {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// Convert one key to base64 DER.
fn resolve_key(jwk: &Jwk) -> Result<String, JwksError> {
    if jwk.kty != RSA_KEY_TYPE {
        return Err(JwksError::UnsupportedKeyType {
            kid: jwk.kid.clone(),
            kty: jwk.kty.clone(),
        });
    }

    let encoded_modulus = jwk.n.as_deref().ok_or_else(|| JwksError::KeyDecode {
        kid: jwk.kid.clone(),
        reason: "missing modulus".to_string(),
    })?;
    let modulus = URL_SAFE_LENIENT
        .decode(encoded_modulus)
        .map_err(|e| JwksError::KeyDecode {
            kid: jwk.kid.clone(),
            reason: e.to_string(),
        })?;
    if modulus.iter().all(|b| *b == 0) {
        return Err(JwksError::KeyDecode {
            kid: jwk.kid.clone(),
            reason: "modulus is empty".to_string(),
        });
    }

    let exponent = jwk.e.as_deref().unwrap_or_default();
    if !ACCEPTED_EXPONENTS.contains(&exponent.trim_end_matches('=')) {
        return Err(JwksError::UnsupportedExponent {
            kid: jwk.kid.clone(),
            exponent: exponent.to_string(),
        });
    }

    Ok(STANDARD.encode(der::rsa_public_key_spki(&modulus, &EXPONENT_65537)))
}

/// Convert a key set into a [`ResolvedKeyMap`].
///
/// # Errors
///
/// Fails on the first key that is not RSA, has a malformed modulus, uses an
/// exponent other than 65537, or repeats an earlier key id. No partial map
/// is returned.
pub fn to_public_key_map(set: &JwkSet) -> Result<ResolvedKeyMap, JwksError> {
    let mut keys = HashMap::with_capacity(set.keys.len());

    for jwk in &set.keys {
        let der = resolve_key(jwk)?;
        if keys.insert(jwk.kid.clone(), der).is_some() {
            return Err(JwksError::DuplicateKeyId {
                kid: jwk.kid.clone(),
            });
        }
    }

    Ok(ResolvedKeyMap(keys))
}

/// HTTP client for the key set endpoint.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    http_client: reqwest::Client,
}

impl JwksClient {
    /// Create a client with a bounded request timeout.
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gw.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.jwks_url
    }

    /// Download the key set.
    ///
    /// # Errors
    ///
    /// `Transport` on connection failure or timeout, `Status` on a non-2xx
    /// response, `Parse` when the body is not a key set.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch_key_set(&self) -> Result<JwkSet, JwksError> {
        tracing::debug!(target: "gw.jwks", "Fetching key set");

        let result = self.fetch_inner().await;
        record_jwks_fetch(if result.is_ok() { "success" } else { "error" });
        result
    }

    async fn fetch_inner(&self) -> Result<JwkSet, JwksError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(JwksError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(JwksError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(JwksError::Transport)?;
        let set: JwkSet = serde_json::from_slice(&body)?;

        tracing::debug!(target: "gw.jwks", key_count = set.keys.len(), "Key set fetched");
        Ok(set)
    }

    /// Fetch the key set and convert it.
    ///
    /// # Errors
    ///
    /// Any error from [`fetch_key_set`](Self::fetch_key_set) or
    /// [`to_public_key_map`].
    pub async fn resolve(&self) -> Result<ResolvedKeyMap, JwksError> {
        let set = self.fetch_key_set().await?;
        to_public_key_map(&set)
    }
}
