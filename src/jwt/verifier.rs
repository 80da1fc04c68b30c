//! Bearer token verification against the identity provider's key set

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::str::FromStr;
use std::sync::Arc;
use tracing;

use super::key_set::KeySetError;
use super::key_set_cache::{HttpKeySetSource, KeySetCache, KeySetSource};
use super::types::{BearerToken, Claims, TokenHeader};

/// Why a token was rejected
///
/// Each variant is a distinct failure so the boundary layer can pick a
/// response code per cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// The token is not three base64url segments with a JSON header
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The header declares an algorithm other than the configured one
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No published key matches the header's `kid`
    #[error("Unknown signing key: {kid}")]
    UnknownSigningKey {
        /// Key ID from the token header
        kid: String,
    },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Missing claim: {0}")]
    MissingClaim(String),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Invalid audience: {0}")]
    InvalidAudience(String),

    /// The key set could not be fetched; not the caller's fault
    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                VerificationError::MalformedToken("Invalid JWT structure".into())
            }
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                VerificationError::MalformedToken(format!("JWT error: {}", err))
            }
            ErrorKind::InvalidSignature => VerificationError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                VerificationError::UnsupportedAlgorithm("Algorithm not supported".into())
            }
            ErrorKind::ExpiredSignature => VerificationError::TokenExpired,
            ErrorKind::ImmatureSignature => VerificationError::TokenNotYetValid,
            ErrorKind::InvalidAudience => {
                VerificationError::InvalidAudience("Audience validation failed".into())
            }
            ErrorKind::InvalidIssuer => {
                VerificationError::InvalidIssuer("Issuer validation failed".into())
            }
            ErrorKind::MissingRequiredClaim(claim) => VerificationError::MissingClaim(claim.clone()),
            // Key or crypto backend failures: never accept.
            _ => VerificationError::InvalidSignature,
        }
    }
}

impl From<KeySetError> for VerificationError {
    fn from(err: KeySetError) -> Self {
        match err {
            KeySetError::KeyNotFound { kid } => VerificationError::UnknownSigningKey { kid },
            KeySetError::Unavailable(reason) => VerificationError::KeySetUnavailable(reason),
        }
    }
}

/// Expected audience and issuer, plus clock skew allowance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    pub audience: String,
    pub issuer: String,
    /// Seconds of clock skew tolerated on `exp` and `nbf`
    pub leeway: u64,
}

impl VerifierSettings {
    pub fn new(audience: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            leeway: 0,
        }
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Decode the JOSE header without checking the signature
pub fn decode_token_header(token: &str) -> Result<TokenHeader, VerificationError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(VerificationError::MalformedToken(
            "expected three dot-separated segments".into(),
        ));
    };

    if header.is_empty() {
        return Err(VerificationError::MalformedToken("empty header segment".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| VerificationError::MalformedToken(format!("header is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| VerificationError::MalformedToken(format!("header is not a JOSE header: {}", e)))
}

/// Verifies RS-signed bearer tokens and their standard claims
pub struct TokenVerifier<S = HttpKeySetSource> {
    keys: Arc<KeySetCache<S>>,
    settings: VerifierSettings,
}

impl<S: KeySetSource> TokenVerifier<S> {
    pub fn new(keys: Arc<KeySetCache<S>>, settings: VerifierSettings) -> Self {
        Self { keys, settings }
    }

    pub fn key_set(&self) -> &Arc<KeySetCache<S>> {
        &self.keys
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verify against the configured audience and issuer
    pub async fn verify(&self, token: &BearerToken) -> Result<Claims, VerificationError> {
        self.verify_for(token, &self.settings.audience, &self.settings.issuer)
            .await
    }

    /// Verify signature, expiry, issuer and audience, in that order
    pub async fn verify_for(
        &self,
        token: &BearerToken,
        audience: &str,
        issuer: &str,
    ) -> Result<Claims, VerificationError> {
        let token = token.as_str();
        let header = decode_token_header(token)?;

        let algorithm = self.keys.algorithm();
        match Algorithm::from_str(&header.alg) {
            Ok(declared) if declared == algorithm => {}
            _ => {
                tracing::warn!("Rejecting token declaring algorithm {}", header.alg);
                return Err(VerificationError::UnsupportedAlgorithm(header.alg));
            }
        }

        let kid = header
            .kid
            .ok_or_else(|| VerificationError::MalformedToken("JWT missing kid in header".into()))?;

        let key = self.keys.get_key(&kid).await?;

        // Signature only; claim checks below run in a fixed order with strict expiry.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, key.decoding_key(), &validation)?.claims;
        self.validate_claims(&claims, audience, issuer)?;

        tracing::debug!("Verified token with kid: {}, algorithm: {:?}", kid, algorithm);
        Ok(claims)
    }

    fn validate_claims(
        &self,
        claims: &Claims,
        audience: &str,
        issuer: &str,
    ) -> Result<(), VerificationError> {
        let now = jsonwebtoken::get_current_timestamp() as i64;
        let leeway = self.settings.leeway as i64;

        let exp = claims.exp.ok_or_else(|| VerificationError::MissingClaim("exp".into()))?;
        if exp <= now - leeway {
            return Err(VerificationError::TokenExpired);
        }

        if let Some(nbf) = claims.nbf {
            if nbf > now + leeway {
                return Err(VerificationError::TokenNotYetValid);
            }
        }

        match claims.iss.as_deref() {
            Some(iss) if iss == issuer => {}
            Some(iss) => return Err(VerificationError::InvalidIssuer(iss.to_string())),
            None => return Err(VerificationError::InvalidIssuer("missing iss claim".into())),
        }

        match &claims.aud {
            Some(aud) if aud.contains(audience) => Ok(()),
            Some(_) => Err(VerificationError::InvalidAudience(format!(
                "token not issued for {}",
                audience
            ))),
            None => Err(VerificationError::InvalidAudience("missing aud claim".into())),
        }
    }
}
