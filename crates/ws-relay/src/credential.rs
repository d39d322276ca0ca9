use std::fmt;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::error::SessionError;

/// An opaque bearer credential for the upstream handshake.
///
/// The wrapped string is write-once: it is attached to exactly one upstream
/// `Authorization` header and is never forwarded to the client, persisted,
/// or logged. `Debug` is implemented by hand so the secret cannot leak
/// through tracing fields or error formatting.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw bearer value. Only the upstream connector reads this.
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// How the relay obtains the bearer credential for a session.
#[derive(Debug, Clone)]
pub enum CredentialMode {
    /// A process-wide server secret, loaded once at startup and shared
    /// read-only across all sessions. `None` means the secret was absent at
    /// startup; every session is then refused with a config-missing close.
    Static(Option<Credential>),

    /// The client hands over a short-lived token in its first control
    /// message: `{"type":"auth","token":"..."}`. The message must arrive
    /// within `timeout` or the session is refused.
    TokenHandoff { timeout: Duration },
}

/// Outcome of credential resolution for one session.
#[derive(Debug)]
pub(crate) enum Resolution {
    Credential(Credential),
    /// The client went away (disconnect or close frame) while we were
    /// waiting for its auth message. Not an error; there is nobody left to
    /// send a close code to.
    ClientGone,
}

/// Resolve the credential for a session, consuming at most one frame from
/// the client stream (exactly one in token-handoff mode, none in static
/// mode). Fails fast; on any `Err` the caller must close the client with
/// the error's close code and must not dial the upstream.
pub(crate) async fn resolve<S>(
    client: &mut S,
    mode: &CredentialMode,
) -> Result<Resolution, SessionError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    match mode {
        CredentialMode::Static(Some(secret)) => Ok(Resolution::Credential(secret.clone())),
        CredentialMode::Static(None) => Err(SessionError::MissingCredential),
        CredentialMode::TokenHandoff { timeout } => {
            let frame = tokio::time::timeout(*timeout, client.next())
                .await
                .map_err(|_| SessionError::AuthTimeout)?;

            let text = match frame {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                    return Ok(Resolution::ClientGone)
                }
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(other)) => {
                    return Err(SessionError::AuthRejected(format!(
                        "expected a text auth frame, got {}",
                        frame_kind(&other)
                    )))
                }
            };

            parse_auth_token(&text).map(Resolution::Credential)
        }
    }
}

/// First control message in token-handoff mode. Extra fields are ignored.
#[derive(Deserialize)]
struct AuthMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    token: String,
}

/// Accept only a message with `type` equal to the literal `auth` and a
/// non-empty `token` field.
fn parse_auth_token(text: &str) -> Result<Credential, SessionError> {
    let message: AuthMessage = serde_json::from_str(text)
        .map_err(|_| SessionError::AuthRejected("not a valid auth JSON object".to_string()))?;

    if message.kind != "auth" {
        return Err(SessionError::AuthRejected(format!(
            "unexpected message type '{}'",
            message.kind
        )));
    }
    if message.token.trim().is_empty() {
        return Err(SessionError::AuthRejected("empty token".to_string()));
    }

    Ok(Credential::new(message.token))
}

fn frame_kind(msg: &Message) -> &'static str {
    match msg {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "raw frame",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn token_mode(ms: u64) -> CredentialMode {
        CredentialMode::TokenHandoff {
            timeout: Duration::from_millis(ms),
        }
    }

    // -----------------------------------------------------------------------
    // parse_auth_token
    // -----------------------------------------------------------------------

    #[test]
    fn valid_auth_message_yields_token() {
        let cred = parse_auth_token(r#"{"type":"auth","token":"tok-123"}"#).unwrap();
        assert_eq!(cred.expose(), "tok-123");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let cred =
            parse_auth_token(r#"{"type":"auth","token":"tok-123","session":"abc"}"#).unwrap();
        assert_eq!(cred.expose(), "tok-123");
    }

    #[test]
    fn wrong_type_tag_is_rejected() {
        let err = parse_auth_token(r#"{"type":"hello","token":"tok-123"}"#).unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected(_)));
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = parse_auth_token(r#"{"type":"auth","token":"  "}"#).unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected(_)));
    }

    #[test]
    fn missing_token_field_is_rejected() {
        let err = parse_auth_token(r#"{"type":"auth"}"#).unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_auth_token("not json at all").unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected(_)));
    }

    // -----------------------------------------------------------------------
    // resolve
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn static_mode_clones_the_secret_without_reading_the_stream() {
        let mode = CredentialMode::Static(Some(Credential::new("server-secret")));
        let mut client = stream::pending::<Result<Message, WsError>>();
        match resolve(&mut client, &mode).await.unwrap() {
            Resolution::Credential(cred) => assert_eq!(cred.expose(), "server-secret"),
            Resolution::ClientGone => panic!("unexpected ClientGone"),
        }
    }

    #[tokio::test]
    async fn static_mode_without_secret_fails_fast() {
        let mode = CredentialMode::Static(None);
        let mut client = stream::pending::<Result<Message, WsError>>();
        let err = resolve(&mut client, &mode).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredential));
    }

    #[tokio::test]
    async fn token_mode_times_out_when_client_stays_silent() {
        let mut client = stream::pending::<Result<Message, WsError>>();
        let err = resolve(&mut client, &token_mode(50)).await.unwrap_err();
        assert!(matches!(err, SessionError::AuthTimeout));
    }

    #[tokio::test]
    async fn token_mode_accepts_a_valid_first_frame() {
        let mut client = stream::iter(vec![Ok(Message::Text(
            r#"{"type":"auth","token":"handoff-token"}"#.to_string(),
        ))]);
        match resolve(&mut client, &token_mode(1000)).await.unwrap() {
            Resolution::Credential(cred) => assert_eq!(cred.expose(), "handoff-token"),
            Resolution::ClientGone => panic!("unexpected ClientGone"),
        }
    }

    #[tokio::test]
    async fn token_mode_rejects_a_binary_first_frame() {
        let mut client = stream::iter(vec![Ok(Message::Binary(vec![1, 2, 3]))]);
        let err = resolve(&mut client, &token_mode(1000)).await.unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn client_disconnect_during_wait_is_not_an_error() {
        let mut client = stream::iter(Vec::<Result<Message, WsError>>::new());
        match resolve(&mut client, &token_mode(1000)).await.unwrap() {
            Resolution::ClientGone => {}
            Resolution::Credential(_) => panic!("expected ClientGone"),
        }
    }

    #[tokio::test]
    async fn client_close_frame_during_wait_is_not_an_error() {
        let mut client = stream::iter(vec![Ok(Message::Close(None))]);
        match resolve(&mut client, &token_mode(1000)).await.unwrap() {
            Resolution::ClientGone => {}
            Resolution::Credential(_) => panic!("expected ClientGone"),
        }
    }

    // -----------------------------------------------------------------------
    // redaction
    // -----------------------------------------------------------------------

    #[test]
    fn debug_output_never_contains_the_secret() {
        let cred = Credential::new("super-secret-value");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("super-secret-value"));

        let mode = CredentialMode::Static(Some(cred));
        let debug = format!("{:?}", mode);
        assert!(!debug.contains("super-secret-value"));
    }
}
