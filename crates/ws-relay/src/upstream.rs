use http::header::AUTHORIZATION;
use http::HeaderValue;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::credential::Credential;
use crate::error::SessionError;

/// An established connection to the upstream realtime API.
pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the upstream WebSocket connection, attaching the credential as a
/// bearer `Authorization` header on the handshake request. That header is
/// the only place the credential is ever used.
///
/// One attempt, no retry: reconnect/backoff policy belongs to the client,
/// and masking upstream failures here would hide real outages. Any
/// handshake failure is a [`SessionError::Connect`]; the caller closes the
/// client session with the upstream-unreachable close code and never starts
/// the relay.
pub(crate) async fn connect(
    url: &str,
    credential: &Credential,
) -> Result<UpstreamStream, SessionError> {
    let mut request = url.into_client_request().map_err(SessionError::Connect)?;

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
        .map_err(|_| {
            SessionError::AuthRejected("token is not a valid header value".to_string())
        })?;
    bearer.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (stream, response) = connect_async(request).await.map_err(SessionError::Connect)?;
    debug!(status = %response.status(), "upstream handshake complete");

    Ok(stream)
}
