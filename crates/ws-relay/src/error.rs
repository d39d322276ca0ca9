use thiserror::Error;
use tokio_tungstenite::tungstenite::protocol::frame::{coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::relay::Direction;

/// Close code sent when the server-side credential is not configured.
pub const CLOSE_CONFIG_MISSING: u16 = 4000;
/// Close code sent when the client's auth message is missing or invalid.
pub const CLOSE_AUTH_REJECTED: u16 = 4001;
/// Close code sent when no auth message arrived within the handoff timeout.
pub const CLOSE_AUTH_TIMEOUT: u16 = 4002;
/// Close code sent when the upstream handshake failed.
pub const CLOSE_UPSTREAM_UNREACHABLE: u16 = 4003;

/// Everything that can end a relay session abnormally.
///
/// Each variant maps to a distinct WebSocket close code so the client can
/// tell configuration problems, auth failures, upstream outages, and
/// mid-session transport errors apart without parsing reason strings.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Static-secret mode is active but no secret was loaded at startup.
    #[error("server credential is not configured")]
    MissingCredential,

    /// Token-handoff mode: the client sent nothing within the deadline.
    #[error("timed out waiting for auth message")]
    AuthTimeout,

    /// Token-handoff mode: the first client frame was not a valid auth
    /// message. The string describes what was wrong with it.
    #[error("auth message rejected: {0}")]
    AuthRejected(String),

    /// The upstream WebSocket handshake failed (DNS, TCP, TLS, or a
    /// rejected Authorization header). Never raised once the relay is
    /// running.
    #[error("upstream connection failed: {0}")]
    Connect(#[source] WsError),

    /// A transport failure on either leg while forwarding.
    #[error("transport failure while forwarding {direction}: {source}")]
    Relay {
        direction: Direction,
        #[source]
        source: WsError,
    },
}

impl SessionError {
    /// The close frame surfaced to the client when this error ends the
    /// session. Reason strings are short and free of credential material.
    pub fn close_frame(&self) -> CloseFrame<'static> {
        match self {
            Self::MissingCredential => CloseFrame {
                code: CloseCode::Library(CLOSE_CONFIG_MISSING),
                reason: "server credential not configured".into(),
            },
            Self::AuthTimeout => CloseFrame {
                code: CloseCode::Library(CLOSE_AUTH_TIMEOUT),
                reason: "timed out waiting for auth message".into(),
            },
            Self::AuthRejected(reason) => CloseFrame {
                code: CloseCode::Library(CLOSE_AUTH_REJECTED),
                reason: format!("auth rejected: {reason}").into(),
            },
            Self::Connect(_) => CloseFrame {
                code: CloseCode::Library(CLOSE_UPSTREAM_UNREACHABLE),
                reason: "upstream connection failed".into(),
            },
            Self::Relay { direction, .. } => CloseFrame {
                code: CloseCode::Error,
                reason: format!("relay transport error ({direction})").into(),
            },
        }
    }
}
