//! Token verification for the Pool Gateway.
//!
//! Verifies user-pool tokens against the verification keys resolved from the
//! pool's JWKS at startup.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted
//! - The `kid` header must name a key loaded at startup
//! - Expiration is validated with clock skew tolerance; `iat` may not be in the future
//! - Issuer must match the configured pool; `token_use` must be `access` or `id`
//! - Generic error messages prevent information leakage

use crate::auth::claims::Claims;
use crate::errors::GatewayError;
use crate::jwks::ResolvedKeyMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;

/// Maximum accepted token size in bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Accepted values of the `token_use` claim.
const ACCEPTED_TOKEN_USES: [&str; 2] = ["access", "id"];

const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Failure to build a [`TokenVerifier`] from resolved keys.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("no verification keys available")]
    EmptyKeySet,

    #[error("verification key {kid} is unusable: {reason}")]
    InvalidKey { kid: String, reason: String },
}

fn invalid_token() -> GatewayError {
    GatewayError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Wrap base64 DER `SubjectPublicKeyInfo` in a PEM envelope.
fn spki_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::with_capacity(encoded.len() + 64);
    pem.push_str("-----BEGIN PUBLIC KEY-----\n");
    for line in encoded.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

fn load_key(kid: &str, der_b64: &str) -> Result<DecodingKey, KeyLoadError> {
    let der = STANDARD
        .decode(der_b64)
        .map_err(|e| KeyLoadError::InvalidKey {
            kid: kid.to_string(),
            reason: e.to_string(),
        })?;

    DecodingKey::from_rsa_pem(spki_pem(&der).as_bytes()).map_err(|e| KeyLoadError::InvalidKey {
        kid: kid.to_string(),
        reason: e.to_string(),
    })
}

/// Extract the `kid` header after the size check.
fn extract_kid(token: &str) -> Result<String, GatewayError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "gw.auth.jwt",
            size = token.len(),
            "Token exceeds maximum size"
        );
        return Err(invalid_token());
    }

    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "gw.auth.jwt", error = %e, "Token header is malformed");
        invalid_token()
    })?;

    header.kid.ok_or_else(|| {
        tracing::debug!(target: "gw.auth.jwt", "Token header has no kid");
        invalid_token()
    })
}

/// Verifies RS256 tokens against a fixed key map.
pub struct TokenVerifier {
    keys: HashMap<String, DecodingKey>,
    validation: Validation,
    leeway_seconds: i64,
}

impl TokenVerifier {
    /// Build a verifier from resolved keys.
    ///
    /// # Errors
    ///
    /// `EmptyKeySet` when `keys` is empty, `InvalidKey` when an entry cannot
    /// be parsed as an RSA public key.
    pub fn new(
        keys: &ResolvedKeyMap,
        issuer: &str,
        leeway_seconds: u64,
    ) -> Result<Self, KeyLoadError> {
        if keys.is_empty() {
            return Err(KeyLoadError::EmptyKeySet);
        }

        let keys = keys
            .iter()
            .map(|(kid, der)| Ok((kid.to_string(), load_key(kid, der)?)))
            .collect::<Result<HashMap<_, _>, KeyLoadError>>()?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = leeway_seconds;
        validation.validate_exp = true;
        // ID tokens carry `aud`, access tokens `client_id`; neither is checked
        validation.validate_aud = false;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        tracing::info!(
            target: "gw.auth.jwt",
            key_count = keys.len(),
            "Token verifier initialized"
        );

        Ok(Self {
            keys,
            validation,
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        })
    }

    /// Number of verification keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidToken` with a generic message for every
    /// failure.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<Claims, GatewayError> {
        let kid = extract_kid(token)?;

        let key = self.keys.get(&kid).ok_or_else(|| {
            tracing::debug!(target: "gw.auth.jwt", kid = %kid, "Unknown signing key");
            invalid_token()
        })?;

        let claims = decode::<Claims>(token, key, &self.validation)
            .map_err(|e| {
                tracing::debug!(target: "gw.auth.jwt", error = %e, "Token verification failed");
                invalid_token()
            })?
            .claims;

        if !ACCEPTED_TOKEN_USES.contains(&claims.token_use.as_str()) {
            tracing::debug!(
                target: "gw.auth.jwt",
                token_use = %claims.token_use,
                "Unexpected token_use"
            );
            return Err(invalid_token());
        }

        let now = chrono::Utc::now().timestamp();
        if claims.iat > now.saturating_add(self.leeway_seconds) {
            tracing::debug!(target: "gw.auth.jwt", "Token issued in the future");
            return Err(invalid_token());
        }

        tracing::debug!(target: "gw.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}
