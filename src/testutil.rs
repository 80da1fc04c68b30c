//! Shared fixtures for unit tests: RSA keys, token minting and a scripted key set source

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::gate::AuthorizationGate;
use crate::jwt::key_set::KeySetError;
use crate::jwt::key_set_cache::{KeySetCache, KeySetSource};
use crate::jwt::verifier::{TokenVerifier, VerifierSettings};

pub(crate) const TEST_ISSUER: &str = "https://casting.test.auth0.com/";
pub(crate) const TEST_AUDIENCE: &str = "casting";

/// An RSA key pair whose public half can be published in a JWKS document
pub(crate) struct TestKey {
    pub kid: &'static str,
    pub private_pem: &'static str,
    pub modulus: &'static str,
}

pub(crate) static PRIMARY: TestKey = TestKey {
    kid: "primary-2024",
    private_pem: include_str!("../tests/fixtures/primary_key.pem"),
    modulus: "gc93OPpQgns2SydKODm0cMpNGJjOXu4y-HmG9iQEZEalu756vmWlV_nAXtEl-bSpL8WNHz7FxHU2cltHp_pND9ZxAjvwAbTHcYSEhQzX2qmdVD6LOB1X38Lxset0HT5SrFOj5C7qJCrqgir0gZbn8vqQLGOJ0dSVgNLOX_gQrgm5-1bYj8peh9PYv93tujcP8wqs0CuugpfodsRrjE91zR5_QDHg0tmDY3wpvjsaSQ-qIRb4tq2mFd9-sldJWYVzLMpL1xIzk7xp4H7_DfLOLOVr2rgVJHRoGkG-tNBf6x5TM43yb48w-M6PlmwwHTRe_4lVHBZDXBsgSkZk9fkwSw",
};

pub(crate) static ROTATED: TestKey = TestKey {
    kid: "rotated-2025",
    private_pem: include_str!("../tests/fixtures/rotated_key.pem"),
    modulus: "1UHqqsgsWLNmisPgEI9wmbBVbUzyY8VGixlEsBdDXQu7Nb4f8kjVV9d1IWrQqBt8fXBz0xRgQcAzFTn-NDeRZ6A2d3CwiccgDoeqtjkbDIPnwey-a3GC4VnYFhN2z8Vi4zgsVrHtI9bk4lCmrg9JnVPTyG1aL_KDVeH18x0JXwOX7WUSY72UIO5-BtQIVsdte-JD58Hm1znr_tYWAL-m1GxdViuP8XK0BmsHl2APXhcW9eA3a2cnovU2lMK8yDpDOXW7SF2zv1FKLHLugnoA5WU6aD1Pr783PAJXXDUg9v_Sqq8KAmMYPry3ZpwM-O8s_JmX9sMqmBltAtK4NLAcfw",
};

/// Never published; tokens signed with it must be rejected
pub(crate) static ROGUE: TestKey = TestKey {
    kid: "rogue",
    private_pem: include_str!("../tests/fixtures/rogue_key.pem"),
    modulus: "lIItiQ4aDScnXlQdrysL02YLBTN57Ky06mcPefPvBwFkS6ky8q8o2EG9-rDjL5XnN2Uwf6hGRA8Dl9AUBMwJbU379GW-Nn0NP4KoJQi23L6W-74FzJw3u5iq1GBP_a_b5YWhVK3I3z8GFOwDG6GDxA2bm2XPO_6abPbmGMCo0xCkNh1UJjlz8ygsX7Q80Kaj69K-3xulvd583RUV5i01yITL26IIorWbusu3PFZ-BqnnqmdyMk78EfBzanCLJcl316H5kX6mr84VjTxY1_xnEiuL25COwdGetrSil7Q2CELBawUCyeR1X4fJpTFFIGuWpNQXcqYYcjmL7AQdmV38VQ",
};

pub(crate) fn rsa_jwk(key: &TestKey) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": key.kid,
        "n": key.modulus,
        "e": "AQAB",
    })
}

pub(crate) fn jwks_json(keys: &[&TestKey]) -> String {
    let keys: Vec<Value> = keys.iter().map(|key| rsa_jwk(key)).collect();
    json!({ "keys": keys }).to_string()
}

pub(crate) fn now() -> i64 {
    jsonwebtoken::get_current_timestamp() as i64
}

/// Claims accepted by [`test_verifier`], granting `permissions`
pub(crate) fn claims_with_permissions(permissions: &[&str]) -> Value {
    let now = now();
    json!({
        "iss": TEST_ISSUER,
        "sub": "auth0|casting-director",
        "aud": [TEST_AUDIENCE, "https://casting.test.auth0.com/userinfo"],
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    })
}

/// Sign `claims` with `key`, advertising `key.kid` in the header
pub(crate) fn mint(key: &TestKey, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid.to_string());
    mint_with_header(key, &header, claims)
}

pub(crate) fn mint_with_header(key: &TestKey, header: &Header, claims: &Value) -> String {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_pem.as_bytes()).unwrap();
    encode(header, claims, &encoding_key).unwrap()
}

/// Key set source serving a scripted document and counting fetches
pub(crate) struct StaticKeySetSource {
    response: Mutex<Result<String, KeySetError>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl StaticKeySetSource {
    pub(crate) fn with_body(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(body.to_string())),
            delay: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        })
    }

    pub(crate) fn serving(keys: &[&TestKey]) -> Arc<Self> {
        Self::with_body(&jwks_json(keys))
    }

    pub(crate) fn failing(reason: &str) -> Arc<Self> {
        let source = Self::with_body("");
        source.set_failure(reason);
        source
    }

    pub(crate) fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub(crate) fn set_keys(&self, keys: &[&TestKey]) {
        *self.response.lock().unwrap() = Ok(jwks_json(keys));
    }

    pub(crate) fn set_failure(&self, reason: &str) {
        *self.response.lock().unwrap() = Err(KeySetError::Unavailable(reason.to_string()));
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl KeySetSource for StaticKeySetSource {
    async fn fetch(&self) -> Result<String, KeySetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}

pub(crate) fn test_verifier(source: &Arc<StaticKeySetSource>) -> TokenVerifier<Arc<StaticKeySetSource>> {
    let cache = KeySetCache::new(Arc::clone(source), Algorithm::RS256);
    TokenVerifier::new(Arc::new(cache), VerifierSettings::new(TEST_AUDIENCE, TEST_ISSUER))
}

/// A gate trusting [`PRIMARY`], plus the source behind it
pub(crate) fn test_gate() -> (AuthorizationGate<Arc<StaticKeySetSource>>, Arc<StaticKeySetSource>) {
    let source = StaticKeySetSource::serving(&[&PRIMARY]);
    let gate = AuthorizationGate::new(test_verifier(&source));
    (gate, source)
}
