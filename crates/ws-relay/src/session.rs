use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::{coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credential::{self, Resolution};
use crate::listener::RelayConfig;
use crate::relay::{self, TerminationReason};
use crate::upstream;

impl TerminationReason {
    /// The close frame surfaced to the client for this termination, or
    /// `None` when the client initiated the close itself and is already
    /// gone.
    fn close_frame(&self) -> Option<CloseFrame<'static>> {
        match self {
            Self::ClientDisconnected => None,
            Self::UpstreamClosed => Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "upstream closed".into(),
            }),
            Self::Failed(err) => Some(err.close_frame()),
        }
    }
}

/// Drive one session from accept through teardown.
///
/// Stages run strictly in order: WebSocket accept, credential resolution,
/// upstream connect, bidirectional relay, close. Every early-exit path
/// closes the client with a cause-specific close code, and the upstream
/// socket (once it exists) is always closed before the session ends.
pub(crate) async fn run_session(stream: TcpStream, remote_addr: SocketAddr, config: Arc<RelayConfig>) {
    let session_id = Uuid::new_v4();

    let mut client = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            debug!(%session_id, %remote_addr, %err, "client handshake failed");
            return;
        }
    };
    info!(%session_id, %remote_addr, "client connected");

    let credential = match credential::resolve(&mut client, &config.credential_mode).await {
        Ok(Resolution::Credential(credential)) => credential,
        Ok(Resolution::ClientGone) => {
            info!(%session_id, "client disconnected before auth completed");
            return;
        }
        Err(err) => {
            warn!(%session_id, %err, "session refused before upstream dial");
            let _ = client.close(Some(err.close_frame())).await;
            return;
        }
    };

    let upstream = match upstream::connect(&config.upstream_url, &credential).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%session_id, %err, "upstream connect failed");
            let _ = client.close(Some(err.close_frame())).await;
            return;
        }
    };
    debug!(%session_id, upstream = %config.upstream_url, "upstream connected");

    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let reason = relay::run(
        &mut client_rx,
        &mut client_tx,
        &mut upstream_rx,
        &mut upstream_tx,
    )
    .await;

    match &reason {
        TerminationReason::ClientDisconnected => {
            info!(%session_id, "client disconnected")
        }
        TerminationReason::UpstreamClosed => info!(%session_id, "upstream closed"),
        TerminationReason::Failed(err) => {
            warn!(%session_id, %err, "relay terminated on transport error")
        }
    }

    teardown(client_tx, upstream_tx, reason.close_frame()).await;
    info!(%session_id, "session closed");
}

/// Close both sockets exactly once.
///
/// Each step tolerates a peer that is already gone (send and close errors
/// are swallowed), so a session whose two directions failed
/// near-simultaneously still tears down without raising, and the client
/// sees at most one close frame.
async fn teardown<CW, UW>(mut client_tx: CW, mut upstream_tx: UW, frame: Option<CloseFrame<'static>>)
where
    CW: Sink<Message, Error = WsError> + Unpin,
    UW: Sink<Message, Error = WsError> + Unpin,
{
    if let Some(frame) = frame {
        let _ = client_tx.send(Message::Close(Some(frame))).await;
    }
    let _ = client_tx.close().await;
    let _ = upstream_tx.close().await;
}
