mod cli;
mod config;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ws_relay::{Credential, CredentialMode, RelayConfig, RelayServer};

use crate::cli::Cli;

/// Build the credential mode from config, resolving the static secret from
/// the environment exactly once. The secret value is never logged.
fn resolve_credential_mode(auth: &config::AuthConfig) -> CredentialMode {
    match auth.mode.to_lowercase().as_str() {
        "token" => CredentialMode::TokenHandoff {
            timeout: Duration::from_secs(auth.handoff_timeout_secs),
        },
        mode => {
            if mode != "static" {
                warn!(mode, "unknown auth mode; falling back to static");
            }
            let secret = std::env::var(&auth.secret_env)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(Credential::new);
            if secret.is_none() {
                warn!(
                    var = %auth.secret_env,
                    "server secret not set; sessions will be refused until it is configured"
                );
            }
            CredentialMode::Static(secret)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref listen) = cli.listen {
        cfg.network.listen_addr = listen.clone();
    }
    if let Some(ref upstream) = cli.upstream {
        cfg.network.upstream_url = upstream.clone();
    }
    if let Some(ref mode) = cli.auth_mode {
        cfg.auth.mode = mode.clone();
    }

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(
        config_file = %cli.config.display(),
        listen = %cfg.network.listen_addr,
        upstream = %cfg.network.upstream_url,
        auth_mode = %cfg.auth.mode,
        "pulse-relay starting"
    );

    // 4. Resolve the credential mode (and the static secret, once).
    let credential_mode = resolve_credential_mode(&cfg.auth);

    // 5. Bind and run the relay until a shutdown signal arrives.
    let listen_addr = cfg
        .network
        .listen_addr
        .parse()
        .context("invalid listen address")?;

    let server = RelayServer::bind(RelayConfig {
        listen_addr,
        upstream_url: cfg.network.upstream_url.clone(),
        credential_mode,
    })
    .await?;

    tokio::select! {
        result = server.run() => {
            result.context("relay server exited")?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    info!("pulse-relay stopped");
    Ok(())
}

/// Completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
