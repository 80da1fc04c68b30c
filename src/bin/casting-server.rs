//! Casting agency API server
//!
//! Usage: `casting-server [config.toml]`. Without an argument the path is
//! taken from `CASTING_CONFIG`, falling back to `casting.toml`.

use anyhow::Context;
use casting_gate::casting::{router, CastingStore};
use casting_gate::config::load_config;
use casting_gate::AuthorizationGate;
use tracing::{info, warn};

const CONFIG_ENV: &str = "CASTING_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "casting.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    let auth = config.auth_config()?;
    let gate = AuthorizationGate::from_config(&auth)?;

    info!(
        jwks_url = %auth.jwks_url()?,
        issuer = %auth.issuer()?,
        audience = %auth.audience,
        "starting casting server"
    );

    // Tokens are still verified if this fails; the first request loads the keys.
    match gate.prefetch_keys().await {
        Ok(count) => info!(keys = count, "signing keys loaded"),
        Err(e) => warn!("could not prefetch signing keys: {}", e),
    }

    let app = router(gate, CastingStore::new());

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str())
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!("REST server listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
