use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::credential::CredentialMode;
use crate::session;

/// Configuration for the relay server.
///
/// Shared read-only across all sessions; the credential inside
/// [`CredentialMode::Static`] is the only process-wide secret and is never
/// mutated after startup.
#[derive(Debug)]
pub struct RelayConfig {
    /// Address to bind the listening socket to.
    pub listen_addr: SocketAddr,
    /// URL of the upstream realtime API endpoint (ws:// or wss://).
    pub upstream_url: String,
    /// How sessions obtain the upstream bearer credential.
    pub credential_mode: CredentialMode,
}

/// The relay server.
///
/// Accepts client WebSocket connections and hands each one to its own
/// session task. Sessions are fully independent: no state is shared between
/// them beyond the read-only [`RelayConfig`].
pub struct RelayServer {
    listener: TcpListener,
    config: Arc<RelayConfig>,
}

impl RelayServer {
    /// Bind the listening socket. No session is accepted until
    /// [`run`](Self::run) is called.
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("binding to {}", config.listen_addr))?;
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// The address actually bound (useful when configured with port 0).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("reading bound listener address")
    }

    /// Run the accept loop forever. Each connection is handled in its own
    /// Tokio task.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(addr = %self.local_addr()?, upstream = %self.config.upstream_url, "relay listening");

        loop {
            let (stream, remote_addr) = self
                .listener
                .accept()
                .await
                .context("accepting client connection")?;
            let config = Arc::clone(&self.config);

            tokio::spawn(session::run_session(stream, remote_addr, config));
        }
    }
}
