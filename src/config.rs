//! Configuration parsing module
//!
//! Configuration is loaded from a TOML file with an `[auth]` section
//! describing the identity provider and a `[server]` section for the binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use casting_gate::config::load_config;
//!
//! let config = load_config("casting.toml")?;
//! let gate = AuthorizationGate::from_config(&config.auth_config()?)?;
//! ```

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CastingError, Result};
use crate::jwt::key_set_cache::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_AGE};
use crate::jwt::verifier::VerifierSettings;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastingConfig {
    /// Identity provider and token validation settings
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub server: ServerConfig,
}

impl CastingConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Get the auth section
    pub fn auth_config(&self) -> Result<AuthConfig> {
        self.auth.clone().ok_or_else(|| {
            CastingError::Config("[auth] section not found in config file".to_string())
        })
    }
}

/// Identity provider configuration
///
/// Either `domain` or both `jwks_url` and `issuer` must be set. Explicit
/// values take precedence over the ones derived from `domain`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Tenant domain, e.g. "casting.eu.auth0.com"
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub jwks_url: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected audience (the API identifier)
    #[serde(default)]
    pub audience: String,

    /// Accepted signing algorithm (default: "RS256")
    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Age after which the key set is refreshed on the next lookup; 0 disables
    #[serde(default)]
    pub key_set_max_age_secs: Option<u64>,

    #[serde(default)]
    pub leeway_secs: Option<u64>,
}

impl AuthConfig {
    fn domain(&self) -> Option<&str> {
        self.domain
            .as_deref()
            .map(|domain| domain.trim_start_matches("https://").trim_end_matches('/'))
            .filter(|domain| !domain.is_empty())
    }

    /// URL of the published key set
    pub fn jwks_url(&self) -> Result<String> {
        match (&self.jwks_url, self.domain()) {
            (Some(url), _) if !url.is_empty() => Ok(url.clone()),
            (_, Some(domain)) => Ok(format!("https://{}/.well-known/jwks.json", domain)),
            _ => Err(CastingError::Config(
                "either auth.domain or auth.jwks_url is required".to_string(),
            )),
        }
    }

    /// Expected `iss` claim, trailing slash included for a derived issuer
    pub fn issuer(&self) -> Result<String> {
        match (&self.issuer, self.domain()) {
            (Some(issuer), _) if !issuer.is_empty() => Ok(issuer.clone()),
            (_, Some(domain)) => Ok(format!("https://{}/", domain)),
            _ => Err(CastingError::Config(
                "either auth.domain or auth.issuer is required".to_string(),
            )),
        }
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        let name = self.algorithm.as_deref().unwrap_or("RS256");
        let algorithm = Algorithm::from_str(name).map_err(|_| {
            CastingError::Config(format!("unknown signing algorithm: {}", name))
        })?;

        match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => Ok(algorithm),
            other => Err(CastingError::Config(format!(
                "signing algorithm {:?} is not supported, expected an RSA algorithm",
                other
            ))),
        }
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        match self.fetch_timeout_secs {
            None => Ok(DEFAULT_FETCH_TIMEOUT),
            Some(0) => Err(CastingError::Config(
                "auth.fetch_timeout_secs must be greater than zero".to_string(),
            )),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    pub fn key_set_max_age(&self) -> Option<Duration> {
        match self.key_set_max_age_secs {
            None => Some(DEFAULT_MAX_AGE),
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn verifier_settings(&self) -> Result<VerifierSettings> {
        if self.audience.trim().is_empty() {
            return Err(CastingError::Config(
                "auth.audience must not be empty".to_string(),
            ));
        }

        Ok(VerifierSettings::new(self.audience.clone(), self.issuer()?)
            .with_leeway(self.leeway_secs.unwrap_or(0)))
    }

    /// Check every derived setting without building anything
    pub fn validate(&self) -> Result<()> {
        self.jwks_url()?;
        self.algorithm()?;
        self.fetch_timeout()?;
        self.verifier_settings()?;
        Ok(())
    }
}

/// Server configuration for the casting-server binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Load configuration from a TOML file
///
/// The `[auth]` section, when present, is validated as part of loading.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CastingConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let config: CastingConfig = toml::from_str(&content)
        .map_err(|e| CastingError::Config(format!("Failed to parse TOML config: {}", e)))?;

    if let Some(auth) = &config.auth {
        auth.validate()?;
    }

    Ok(config)
}
