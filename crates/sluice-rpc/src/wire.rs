//! Message framing and request/reply exchange for the daemon protocol.
//!
//! Each message is a five byte header (protocol version, big-endian body length)
//! followed by a zlib-compressed rencode body.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{RpcError, RpcResult};
use crate::rencode;

/// Protocol version byte sent in every message header.
pub const PROTOCOL_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;
/// Largest compressed or inflated body accepted from the daemon.
pub const MAX_BODY_LEN: usize = 64 * 1024 * 1024;

const RPC_RESPONSE: i64 = 1;
const RPC_ERROR: i64 = 2;
const RPC_EVENT: i64 = 3;

/// A decoded message received from the daemon.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    Response {
        request_id: i64,
        value: Value,
    },
    Error {
        request_id: i64,
        exception: String,
        message: String,
    },
    Event {
        name: String,
    },
}

/// Serialize, compress, and write a single message.
pub(crate) async fn write_message<W>(writer: &mut W, payload: &Value) -> RpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&rencode::encode(payload))
        .map_err(|source| RpcError::Compression { source })?;
    let body = encoder
        .finish()
        .map_err(|source| RpcError::Compression { source })?;
    let body_len = u32::try_from(body.len())
        .ok()
        .filter(|len| usize::try_from(*len).is_ok_and(|len| len <= MAX_BODY_LEN))
        .ok_or_else(|| {
            RpcError::protocol("request_too_large", Some(body.len().to_string()))
        })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.push(PROTOCOL_VERSION);
    frame.extend_from_slice(&body_len.to_be_bytes());
    frame.extend_from_slice(&body);

    writer
        .write_all(&frame)
        .await
        .map_err(|source| RpcError::Io {
            operation: "write_message",
            source,
        })?;
    writer.flush().await.map_err(|source| RpcError::Io {
        operation: "flush_message",
        source,
    })
}

/// Read, inflate, and decode a single message.
pub(crate) async fn read_message<R>(reader: &mut R) -> RpcResult<Value>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|source| RpcError::Io {
            operation: "read_header",
            source,
        })?;

    let [version, length @ ..] = header;
    if version != PROTOCOL_VERSION {
        return Err(RpcError::protocol(
            "unsupported_protocol_version",
            Some(version.to_string()),
        ));
    }
    let body_len = usize::try_from(u32::from_be_bytes(length))
        .ok()
        .filter(|len| *len <= MAX_BODY_LEN)
        .ok_or_else(|| {
            RpcError::protocol(
                "response_too_large",
                Some(u32::from_be_bytes(length).to_string()),
            )
        })?;

    let mut body = vec![0_u8; body_len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|source| RpcError::Io {
            operation: "read_body",
            source,
        })?;

    let mut inflated = Vec::new();
    let limit = u64::try_from(MAX_BODY_LEN).unwrap_or(u64::MAX) + 1;
    ZlibDecoder::new(body.as_slice())
        .take(limit)
        .read_to_end(&mut inflated)
        .map_err(|source| RpcError::Compression { source })?;
    if inflated.len() > MAX_BODY_LEN {
        return Err(RpcError::protocol("inflated_body_too_large", None));
    }

    Ok(rencode::decode(&inflated)?)
}

/// Build the request envelope `[[request_id, method, args, kwargs]]`.
pub(crate) fn request(
    request_id: i64,
    method: &str,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
) -> Value {
    json!([[request_id, method, args, kwargs]])
}

/// Classify a decoded daemon message.
pub(crate) fn classify(message: Value) -> RpcResult<Reply> {
    let Value::Array(parts) = message else {
        return Err(RpcError::protocol("message_not_a_list", None));
    };
    let mut parts = parts.into_iter();
    let kind = parts.next().and_then(|kind| kind.as_i64());
    match kind {
        Some(RPC_RESPONSE) => {
            let request_id = request_id(parts.next())?;
            let value = parts.next().unwrap_or(Value::Null);
            Ok(Reply::Response { request_id, value })
        }
        Some(RPC_ERROR) => {
            let request_id = request_id(parts.next())?;
            let exception = parts
                .next()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = parts.next().map(exception_message).unwrap_or_default();
            Ok(Reply::Error {
                request_id,
                exception,
                message,
            })
        }
        Some(RPC_EVENT) => {
            let name = parts
                .next()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default();
            Ok(Reply::Event { name })
        }
        other => Err(RpcError::protocol(
            "unknown_message_type",
            other.map(|kind| kind.to_string()),
        )),
    }
}

/// Send one request and wait for its reply, skipping unsolicited events.
pub(crate) async fn exchange<S>(
    stream: &mut S,
    request_id: i64,
    method: &str,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
) -> RpcResult<Value>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_message(stream, &request(request_id, method, args, kwargs)).await?;
    loop {
        match classify(read_message(stream).await?)? {
            Reply::Response {
                request_id: id,
                value,
            } if id == request_id => return Ok(value),
            Reply::Error {
                request_id: id,
                exception,
                message,
            } if id == request_id => {
                return Err(RpcError::Remote {
                    method: method.to_string(),
                    exception,
                    message,
                });
            }
            Reply::Event { name } => {
                debug!(event = %name, "skipping daemon event");
            }
            Reply::Response { request_id: id, .. } | Reply::Error { request_id: id, .. } => {
                return Err(RpcError::protocol(
                    "request_id_mismatch",
                    Some(format!("expected {request_id}, got {id}")),
                ));
            }
        }
    }
}

fn request_id(value: Option<Value>) -> RpcResult<i64> {
    value
        .and_then(|value| value.as_i64())
        .ok_or_else(|| RpcError::protocol("missing_request_id", None))
}

fn exception_message(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn frames_survive_a_stream() -> anyhow::Result<()> {
        let (mut client, mut server) = duplex(4096);
        let payload = request(7, "core.get_session_state", Vec::new(), Map::new());

        write_message(&mut client, &payload).await?;
        let received = read_message(&mut server).await?;
        assert_eq!(received, json!([[7, "core.get_session_state", [], {}]]));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_protocol_version_is_rejected() -> anyhow::Result<()> {
        let (mut client, mut server) = duplex(64);
        client.write_all(&[b'D', 0, 0, 0, 1, 0]).await?;
        let err = read_message(&mut server)
            .await
            .expect_err("version byte should be rejected");
        assert!(matches!(
            err,
            RpcError::Protocol {
                reason: "unsupported_protocol_version",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn closed_stream_is_a_transport_failure() {
        let (client, mut server) = duplex(64);
        drop(client);
        let err = read_message(&mut server)
            .await
            .expect_err("eof should surface");
        assert!(err.is_transport_failure());
    }

    #[test]
    fn classify_reads_daemon_error_arguments() -> anyhow::Result<()> {
        let reply = classify(json!([
            2,
            4,
            "BadLoginError",
            ["Password does not match"],
            {},
            "Traceback ..."
        ]))?;
        assert_eq!(
            reply,
            Reply::Error {
                request_id: 4,
                exception: "BadLoginError".into(),
                message: "Password does not match".into(),
            }
        );
        Ok(())
    }

    #[test]
    fn classify_rejects_unknown_kinds() {
        assert!(classify(json!([9, 1, null])).is_err());
        assert!(classify(json!({"kind": 1})).is_err());
        assert!(classify(json!([1])).is_err());
    }

    #[tokio::test]
    async fn exchange_skips_events_and_matches_request_id() -> anyhow::Result<()> {
        let (mut client, mut daemon) = duplex(4096);
        let responder = tokio::spawn(async move {
            let request = read_message(&mut daemon).await?;
            write_message(&mut daemon, &json!([3, "TorrentAddedEvent", ["abc"]])).await?;
            write_message(&mut daemon, &json!([1, 1, ["abc", "def"]])).await?;
            Ok::<_, RpcError>(request)
        });

        let value = exchange(
            &mut client,
            1,
            "core.get_session_state",
            Vec::new(),
            Map::new(),
        )
        .await?;
        assert_eq!(value, json!(["abc", "def"]));

        let request = responder.await??;
        assert_eq!(request, json!([[1, "core.get_session_state", [], {}]]));
        Ok(())
    }

    #[tokio::test]
    async fn exchange_surfaces_remote_errors() -> anyhow::Result<()> {
        let (mut client, mut daemon) = duplex(4096);
        let responder = tokio::spawn(async move {
            let _ = read_message(&mut daemon).await?;
            write_message(
                &mut daemon,
                &json!([2, 3, "InvalidTorrentError", ["torrent_id not in session"], {}, ""]),
            )
            .await
        });

        let err = exchange(
            &mut client,
            3,
            "core.pause_torrent",
            vec![json!(["abc"])],
            Map::new(),
        )
        .await
        .expect_err("daemon error should propagate");
        responder.await??;

        match err {
            RpcError::Remote {
                method,
                exception,
                message,
            } => {
                assert_eq!(method, "core.pause_torrent");
                assert_eq!(exception, "InvalidTorrentError");
                assert_eq!(message, "torrent_id not in session");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }
}
