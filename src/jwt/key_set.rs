//! Public signing keys published by the identity provider

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing;

/// Key set lookup and fetch failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeySetError {
    /// No key with this identifier, even after a refresh
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID that was looked up
        kid: String,
    },

    /// The key set could not be fetched or parsed
    #[error("Key set unavailable: {0}")]
    Unavailable(String),
}

/// A single RSA public key from the JWKS document
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    modulus: String,
    exponent: String,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Build a key from base64url-encoded RSA components
    pub fn from_rsa_components(
        kid: impl Into<String>,
        algorithm: Algorithm,
        modulus: &str,
        exponent: &str,
    ) -> Result<Self, KeySetError> {
        let kid = kid.into();
        let decoding_key = DecodingKey::from_rsa_components(modulus, exponent).map_err(|e| {
            KeySetError::Unavailable(format!("Invalid RSA components for kid {}: {}", kid, e))
        })?;

        Ok(Self {
            kid,
            algorithm,
            modulus: modulus.to_string(),
            exponent: exponent.to_string(),
            decoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Base64url modulus as published
    pub fn modulus(&self) -> &str {
        &self.modulus
    }

    /// Base64url exponent as published
    pub fn exponent(&self) -> &str {
        &self.exponent
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("exponent", &self.exponent)
            .finish_non_exhaustive()
    }
}

/// Whether a JWK `alg` parameter names the given RS-family algorithm
fn key_algorithm_matches(declared: &KeyAlgorithm, algorithm: Algorithm) -> bool {
    matches!(
        (declared, algorithm),
        (KeyAlgorithm::RS256, Algorithm::RS256)
            | (KeyAlgorithm::RS384, Algorithm::RS384)
            | (KeyAlgorithm::RS512, Algorithm::RS512)
    )
}

/// Convert one JWK into a signing key, or explain why it is unusable
fn signing_key_from_jwk(jwk: &Jwk, algorithm: Algorithm) -> Result<SigningKey, String> {
    let kid = jwk
        .common
        .key_id
        .as_deref()
        .ok_or_else(|| "JWK missing kid field".to_string())?;

    if let Some(key_use) = &jwk.common.public_key_use {
        if *key_use != PublicKeyUse::Signature {
            return Err(format!("kid {} is not a signing key", kid));
        }
    }

    if let Some(declared) = &jwk.common.key_algorithm {
        if !key_algorithm_matches(declared, algorithm) {
            return Err(format!(
                "kid {} declares algorithm {:?}, expected {:?}",
                kid, declared, algorithm
            ));
        }
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            SigningKey::from_rsa_components(kid, algorithm, &rsa.n, &rsa.e).map_err(|e| e.to_string())
        }
        other => Err(format!("kid {} is not an RSA key ({})", kid, key_family(other))),
    }
}

fn key_family(params: &AlgorithmParameters) -> &'static str {
    match params {
        AlgorithmParameters::RSA(_) => "RSA",
        AlgorithmParameters::EllipticCurve(_) => "EC",
        AlgorithmParameters::OctetKey(_) => "oct",
        AlgorithmParameters::OctetKeyPair(_) => "OKP",
        #[allow(unreachable_patterns)]
        _ => "unknown",
    }
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<Value>,
}

/// The full set of signing keys, ordered as published and unique by `kid`
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Arc<SigningKey>>,
    by_kid: HashMap<String, usize>,
}

impl KeySet {
    /// Build a set from already-parsed keys; later duplicates of a `kid` are dropped
    pub fn from_keys(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        let mut set = KeySet::default();
        for key in keys {
            if set.by_kid.contains_key(key.kid()) {
                tracing::warn!("Duplicate kid {} in key set, keeping the first", key.kid());
                continue;
            }
            set.by_kid.insert(key.kid().to_string(), set.keys.len());
            set.keys.push(Arc::new(key));
        }
        set
    }

    /// Parse a JWKS document
    ///
    /// Entries that are not RSA signing keys for `algorithm` are skipped with a
    /// warning. A document that is not JSON or has no `keys` array is an error.
    pub fn from_jwks_json(body: &str, algorithm: Algorithm) -> Result<Self, KeySetError> {
        let raw: RawJwkSet = serde_json::from_str(body)
            .map_err(|e| KeySetError::Unavailable(format!("Failed to parse JWKS: {}", e)))?;

        let mut keys = Vec::with_capacity(raw.keys.len());
        for entry in raw.keys {
            let jwk: Jwk = match serde_json::from_value(entry) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::warn!("Skipping unparseable JWK: {}", e);
                    continue;
                }
            };

            match signing_key_from_jwk(&jwk, algorithm) {
                Ok(key) => {
                    tracing::debug!("Parsed signing key {}: algorithm={:?}", key.kid(), algorithm);
                    keys.push(key);
                }
                Err(reason) => tracing::warn!("Skipping JWK: {}", reason),
            }
        }

        let set = KeySet::from_keys(keys);
        if set.is_empty() {
            tracing::warn!("JWKS document contained no usable signing keys");
        }
        Ok(set)
    }

    pub fn get(&self, kid: &str) -> Option<&Arc<SigningKey>> {
        self.by_kid.get(kid).map(|&idx| &self.keys[idx])
    }

    /// Key identifiers in published order
    pub fn key_ids(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.kid().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
