//! Process-wide JWKS cache with miss-triggered and age-triggered refresh

use jsonwebtoken::Algorithm;
use reqwest::Client;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::key_set::{KeySet, KeySetError, SigningKey};
use crate::error::Result;

/// Upper bound on a single key set fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Age after which the next lookup refreshes the key set proactively
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Wait after a failed refresh before an aged-out set is refreshed again
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Where the raw JWKS document comes from
pub trait KeySetSource: Send + Sync + 'static {
    /// Fetch the JWKS document body
    fn fetch(&self) -> impl Future<Output = std::result::Result<String, KeySetError>> + Send;
}

impl<T: KeySetSource> KeySetSource for Arc<T> {
    fn fetch(&self) -> impl Future<Output = std::result::Result<String, KeySetError>> + Send {
        (**self).fetch()
    }
}

/// Fetches the JWKS document from the identity provider over HTTP
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    http_client: Client,
    jwks_url: String,
}

impl HttpKeySetSource {
    /// Create a source whose requests give up after `timeout`
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, jwks_url))
    }

    /// Use an existing client (its timeout settings apply)
    pub fn with_client(http_client: Client, jwks_url: impl Into<String>) -> Self {
        Self {
            http_client,
            jwks_url: jwks_url.into(),
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> std::result::Result<String, KeySetError> {
        tracing::debug!("Fetching JWKS from: {}", self.jwks_url);

        let response = self
            .http_client
            .get(&self.jwks_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| KeySetError::Unavailable(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(KeySetError::Unavailable(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| KeySetError::Unavailable(format!("Failed to read JWKS response: {}", e)))
    }
}

#[derive(Clone)]
struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Outcome of the latest fetch attempt, guarded by the refresh lock
#[derive(Default)]
struct RefreshState {
    attempts: u64,
    last_failure: Option<(Instant, KeySetError)>,
}

/// What happened to the key set while serving one lookup
enum RefreshOutcome {
    NotAttempted,
    Refreshed,
    Failed(KeySetError),
}

/// Cache of the identity provider's signing keys
///
/// Readers share the last fetched set. A refresh replaces the whole set and at most
/// one fetch is in flight at a time. Callers that queued behind a fetch reuse its
/// outcome, success or failure, instead of fetching again. While a set that has
/// aged out is being refreshed, other readers keep using it without waiting, and
/// after a failed refresh the aged set is served for `retry_interval` before the
/// next proactive attempt.
pub struct KeySetCache<S = HttpKeySetSource> {
    source: S,
    algorithm: Algorithm,
    fetch_timeout: Duration,
    max_age: Option<Duration>,
    retry_interval: Duration,
    current: RwLock<Option<CachedKeySet>>,
    refresh_state: Mutex<RefreshState>,
    attempts: AtomicU64,
    fetch_count: AtomicU64,
}

impl<S: KeySetSource> KeySetCache<S> {
    /// Create an empty cache; the first lookup loads the key set
    pub fn new(source: S, algorithm: Algorithm) -> Self {
        Self {
            source,
            algorithm,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_age: Some(DEFAULT_MAX_AGE),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            current: RwLock::new(None),
            refresh_state: Mutex::new(RefreshState::default()),
            attempts: AtomicU64::new(0),
            fetch_count: AtomicU64::new(0),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// `None` disables age-based refresh; only unknown key IDs trigger a fetch
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Minimum gap between a failed refresh and the next age-triggered one
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Number of fetch attempts made so far, successful or not
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Key IDs of the currently cached set (empty before the first load)
    pub async fn key_ids(&self) -> Vec<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|cached| cached.keys.key_ids())
            .unwrap_or_default()
    }

    /// Load the key set eagerly, e.g. at process start
    pub async fn prefetch(&self) -> std::result::Result<usize, KeySetError> {
        let observed = self.attempts.load(Ordering::Acquire);
        let cached = self.refresh_after(observed).await?;
        Ok(cached.keys.len())
    }

    /// Look up a signing key by ID
    ///
    /// A miss against a previously loaded set refreshes the set once and retries.
    pub async fn get_key(&self, kid: &str) -> std::result::Result<Arc<SigningKey>, KeySetError> {
        let observed = self.attempts.load(Ordering::Acquire);
        let (cached, outcome) = self.snapshot(observed).await?;
        if let Some(key) = cached.keys.get(kid) {
            return Ok(Arc::clone(key));
        }

        match outcome {
            RefreshOutcome::Refreshed => Err(KeySetError::KeyNotFound { kid: kid.to_string() }),
            RefreshOutcome::Failed(err) => Err(err),
            RefreshOutcome::NotAttempted => {
                tracing::debug!("kid {} not in cached key set, refreshing", kid);
                let refreshed = self.refresh_after(observed).await?;
                refreshed
                    .keys
                    .get(kid)
                    .cloned()
                    .ok_or_else(|| KeySetError::KeyNotFound { kid: kid.to_string() })
            }
        }
    }

    fn is_stale(&self, cached: &CachedKeySet) -> bool {
        self.max_age
            .is_some_and(|max_age| cached.fetched_at.elapsed() >= max_age)
    }

    /// Current set, loading it when absent and refreshing it when too old
    async fn snapshot(
        &self,
        observed: u64,
    ) -> std::result::Result<(CachedKeySet, RefreshOutcome), KeySetError> {
        let stale = {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(cached) if !self.is_stale(cached) => {
                    return Ok((cached.clone(), RefreshOutcome::NotAttempted));
                }
                Some(cached) => Some(cached.clone()),
                None => None,
            }
        };

        let Some(stale) = stale else {
            let cached = self.refresh_after(observed).await?;
            return Ok((cached, RefreshOutcome::Refreshed));
        };

        let Ok(mut state) = self.refresh_state.try_lock() else {
            tracing::debug!("Key set refresh in flight, serving last known key set");
            return Ok((stale, RefreshOutcome::NotAttempted));
        };

        let backing_off = state
            .last_failure
            .as_ref()
            .is_some_and(|(failed_at, _)| failed_at.elapsed() < self.retry_interval);
        if backing_off {
            return Ok((stale, RefreshOutcome::NotAttempted));
        }

        match self.refresh_locked(&mut state, observed).await {
            Ok(cached) => Ok((cached, RefreshOutcome::Refreshed)),
            Err(err) => {
                tracing::warn!("Key set refresh failed, serving last known key set: {}", err);
                Ok((stale, RefreshOutcome::Failed(err)))
            }
        }
    }

    /// Wait for the refresh lock, then refresh unless an attempt finished since `observed`
    async fn refresh_after(&self, observed: u64) -> std::result::Result<CachedKeySet, KeySetError> {
        let mut state = self.refresh_state.lock().await;
        self.refresh_locked(&mut state, observed).await
    }

    async fn refresh_locked(
        &self,
        state: &mut RefreshState,
        observed: u64,
    ) -> std::result::Result<CachedKeySet, KeySetError> {
        if state.attempts > observed {
            if let Some((_, err)) = &state.last_failure {
                return Err(err.clone());
            }
            if let Some(cached) = self.current.read().await.as_ref() {
                return Ok(cached.clone());
            }
        }

        let result = match self.fetch().await {
            Ok(keys) => {
                let cached = CachedKeySet {
                    keys: Arc::new(keys),
                    fetched_at: Instant::now(),
                };
                *self.current.write().await = Some(cached.clone());
                state.last_failure = None;
                Ok(cached)
            }
            Err(err) => {
                state.last_failure = Some((Instant::now(), err.clone()));
                Err(err)
            }
        };

        state.attempts += 1;
        self.attempts.store(state.attempts, Ordering::Release);
        result
    }

    async fn fetch(&self) -> std::result::Result<KeySet, KeySetError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let body = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(Ok(body)) => body,
            Ok(Err(err)) => {
                tracing::error!("Key set fetch failed: {}", err);
                return Err(err);
            }
            Err(_) => {
                tracing::error!("Key set fetch timed out after {:?}", self.fetch_timeout);
                return Err(KeySetError::Unavailable(format!(
                    "JWKS fetch timed out after {:?}",
                    self.fetch_timeout
                )));
            }
        };

        let keys = KeySet::from_jwks_json(&body, self.algorithm)?;
        tracing::debug!("Key set refreshed with {} keys", keys.len());
        Ok(keys)
    }
}
