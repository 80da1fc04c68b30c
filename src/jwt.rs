//! Bearer token verification against an identity provider's published keys
//!
//! The key set is fetched lazily, cached, and refreshed when a token names a
//! key the cache does not hold.

pub mod key_set;
pub mod key_set_cache;
pub mod types;
pub mod verifier;

pub use key_set::{KeySet, KeySetError, SigningKey};
pub use key_set_cache::{HttpKeySetSource, KeySetCache, KeySetSource};
pub use types::{Audience, BearerToken, Claims, TokenHeader};
pub use verifier::{TokenVerifier, VerificationError, VerifierSettings};
