//! Token and claim types shared by the verifier and the authorization gate

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Verified JWT claims
///
/// Only ever produced by [`TokenVerifier`](crate::jwt::verifier::TokenVerifier)
/// after the signature and the standard claims have been checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience, either a single string or a list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Expiration time (seconds since the epoch)
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    /// Not-before time
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,
    /// Issued at time
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
    /// Every other claim, including `permissions`
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// NumericDate claim in whole seconds; a fractional part is truncated toward the past
fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) if secs.is_finite() => Ok(Some(secs.floor() as i64)),
        Some(_) => Err(D::Error::custom("NumericDate must be a finite number")),
        None => Ok(None),
    }
}

/// The `aud` claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "casting"`
    Single(String),
    /// `"aud": ["casting", "https://tenant/userinfo"]`
    Many(Vec<String>),
}

impl Audience {
    /// Whether `audience` is one of the token's audiences
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Unverified JOSE header
///
/// Read before the signature is checked and only used to pick a key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Declared signing algorithm
    pub alg: String,
    /// Key identifier
    #[serde(default)]
    pub kid: Option<String>,
    /// Token type
    #[serde(default)]
    pub typ: Option<String>,
}

/// Opaque bearer credential taken from the `Authorization` header
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_deserialize_with_permissions_in_extra() {
        let claims: Claims = serde_json::from_value(json!({
            "iss": "https://casting.example.com/",
            "sub": "auth0|123",
            "aud": ["casting", "https://casting.example.com/userinfo"],
            "exp": 4102444800i64,
            "permissions": ["get:actors", "post:actors"],
        }))
        .unwrap();

        assert_eq!(claims.sub.as_deref(), Some("auth0|123"));
        assert_eq!(claims.exp, Some(4102444800));
        assert!(claims.aud.as_ref().unwrap().contains("casting"));
        assert!(claims.extra.contains_key("permissions"));
        assert!(!claims.extra.contains_key("iss"));
    }

    #[test]
    fn test_claims_missing_standard_claims() {
        let claims: Claims = serde_json::from_value(json!({ "scope": "openid" })).unwrap();
        assert_eq!(claims.iss, None);
        assert_eq!(claims.aud, None);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_fractional_numeric_dates() {
        let claims: Claims = serde_json::from_value(json!({
            "exp": 1700000000.5,
            "nbf": 1699999999.9,
            "iat": 1699999999
        }))
        .unwrap();
        assert_eq!(claims.exp, Some(1700000000));
        assert_eq!(claims.nbf, Some(1699999999));
        assert_eq!(claims.iat, Some(1699999999));
    }

    #[test]
    fn test_non_numeric_date_is_rejected() {
        assert!(serde_json::from_value::<Claims>(json!({ "exp": "tomorrow" })).is_err());
    }

    #[test]
    fn test_audience_single() {
        let aud: Audience = serde_json::from_value(json!("casting")).unwrap();
        assert!(aud.contains("casting"));
        assert!(!aud.contains("Casting"));
    }

    #[test]
    fn test_audience_many() {
        let aud: Audience = serde_json::from_value(json!(["a", "casting"])).unwrap();
        assert!(aud.contains("casting"));
        assert!(!aud.contains("b"));
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("eyJhbGciOiJSUzI1NiJ9.secret.sig");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert_eq!(token.as_str(), "eyJhbGciOiJSUzI1NiJ9.secret.sig");
    }
}
