use std::fmt;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::error::SessionError;

/// One of the two forwarding directions in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToUpstream => f.write_str("client->upstream"),
            Self::UpstreamToClient => f.write_str("upstream->client"),
        }
    }
}

/// Why a relay session stopped forwarding.
#[derive(Debug)]
pub enum TerminationReason {
    /// The client closed cleanly or went away. Not an error.
    ClientDisconnected,
    /// The upstream closed cleanly.
    UpstreamClosed,
    /// A transport failure on either leg.
    Failed(SessionError),
}

/// How a single forwarding direction ended.
#[derive(Debug)]
enum PumpEnd {
    /// The side we read from sent a close frame or ended its stream.
    SourceClosed,
    ReadError(WsError),
    WriteError(WsError),
}

impl PumpEnd {
    fn into_error(self) -> Option<WsError> {
        match self {
            Self::SourceClosed => None,
            Self::ReadError(err) | Self::WriteError(err) => Some(err),
        }
    }
}

/// Forward frames from `reader` to `writer` until either side fails.
///
/// Frames are forwarded verbatim: text stays text, binary stays binary, and
/// ping/pong frames pass through untouched. One frame is in flight at a
/// time, so per-direction FIFO order holds and back-pressure is left to the
/// transport. A close frame from the source ends the direction without
/// being forwarded; the session supervisor owns close semantics for both
/// sockets.
async fn pump<R, W>(reader: &mut R, writer: &mut W) -> PumpEnd
where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
    W: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        let msg = match reader.next().await {
            None => return PumpEnd::SourceClosed,
            Some(Err(err)) => return PumpEnd::ReadError(err),
            Some(Ok(msg)) => msg,
        };

        match msg {
            Message::Close(_) => return PumpEnd::SourceClosed,
            other => {
                if let Err(err) = writer.send(other).await {
                    return PumpEnd::WriteError(err);
                }
            }
        }
    }
}

/// Run both forwarding directions concurrently until the first one ends.
///
/// The two pump futures are joined with `tokio::select!`: when one
/// completes, the other is dropped at its suspension point, which cancels
/// its pending receive or send without faulting. The caller keeps ownership
/// of all four split halves and is responsible for closing both sockets
/// afterwards.
pub(crate) async fn run<CR, CW, UR, UW>(
    client_rx: &mut CR,
    client_tx: &mut CW,
    upstream_rx: &mut UR,
    upstream_tx: &mut UW,
) -> TerminationReason
where
    CR: Stream<Item = Result<Message, WsError>> + Unpin,
    CW: Sink<Message, Error = WsError> + Unpin,
    UR: Stream<Item = Result<Message, WsError>> + Unpin,
    UW: Sink<Message, Error = WsError> + Unpin,
{
    tokio::select! {
        end = pump(client_rx, upstream_tx) => match end.into_error() {
            None => TerminationReason::ClientDisconnected,
            Some(source) => TerminationReason::Failed(SessionError::Relay {
                direction: Direction::ClientToUpstream,
                source,
            }),
        },
        end = pump(upstream_rx, client_tx) => match end.into_error() {
            None => TerminationReason::UpstreamClosed,
            Some(source) => TerminationReason::Failed(SessionError::Relay {
                direction: Direction::UpstreamToClient,
                source,
            }),
        },
    }
}
