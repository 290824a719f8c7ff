//! # Design
//!
//! - Keep error messages constant; store operational context in fields.
//! - Separate transport failures (which trigger a reconnect) from daemon-side
//!   errors and shape mismatches (which propagate untouched).
//! - `ConnectionLost` is the only condition callers are expected to absorb.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias for RPC results.
pub type RpcResult<T> = Result<T, RpcError>;

/// Failures raised while decoding or encoding rencode payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete value was read.
    #[error("unexpected end of rencode input")]
    UnexpectedEof {
        /// Byte offset where more input was required.
        offset: usize,
    },
    /// A type code byte did not match any known rencode type.
    #[error("unknown rencode type code")]
    UnknownTypeCode {
        /// Offending type code.
        code: u8,
        /// Byte offset of the type code.
        offset: usize,
    },
    /// A textual integer or length prefix could not be parsed.
    #[error("invalid rencode integer")]
    InvalidInteger {
        /// Byte offset where the integer started.
        offset: usize,
    },
    /// Bytes remained after the top-level value was decoded.
    #[error("trailing bytes after rencode value")]
    TrailingBytes {
        /// Byte offset of the first unread byte.
        offset: usize,
    },
    /// Nested containers exceeded the supported depth.
    #[error("rencode nesting too deep")]
    NestingTooDeep {
        /// Maximum supported depth.
        limit: usize,
    },
}

/// Primary error type for daemon RPC operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The daemon actively refused the TCP connection.
    #[error("connection refused by daemon")]
    ConnectionRefused {
        /// `host:port` that refused the connection.
        address: String,
    },
    /// Establishing the TCP connection failed for another reason.
    #[error("failed to connect to daemon")]
    Connect {
        /// `host:port` used for the attempt.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configured host could not be used as a TLS server name.
    #[error("invalid tls server name")]
    InvalidServerName {
        /// Host value that failed conversion.
        host: String,
    },
    /// Building the TLS client configuration failed.
    #[error("tls configuration failed")]
    TlsConfig {
        /// Underlying rustls error.
        #[source]
        source: rustls::Error,
    },
    /// The TLS handshake with the daemon failed.
    #[error("tls handshake failed")]
    Tls {
        /// `host:port` used for the handshake.
        address: String,
        /// Underlying IO error reported by the TLS stream.
        #[source]
        source: io::Error,
    },
    /// The transport dropped and the single reconnect attempt failed.
    #[error("connection to daemon lost")]
    ConnectionLost {
        /// Method being invoked when the connection was lost.
        method: String,
        /// Failure that ended the reconnect attempt.
        #[source]
        source: Box<RpcError>,
    },
    /// Reading from or writing to the transport failed.
    #[error("transport io failure")]
    Io {
        /// Transport operation identifier.
        operation: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A request/response exchange exceeded the configured timeout.
    #[error("daemon call timed out")]
    Timeout {
        /// Method (or connection step) that timed out.
        method: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// The daemon sent a message that violates the wire protocol.
    #[error("protocol violation")]
    Protocol {
        /// Machine-readable reason.
        reason: &'static str,
        /// Optional detail captured from the offending message.
        detail: Option<String>,
    },
    /// A message body could not be decoded.
    #[error("message codec failure")]
    Codec {
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },
    /// A compressed message body could not be inflated or deflated.
    #[error("message compression failure")]
    Compression {
        /// Underlying zlib error.
        #[source]
        source: io::Error,
    },
    /// The daemon rejected the supplied credentials.
    #[error("daemon rejected credentials")]
    AuthenticationFailed {
        /// Username presented during login.
        username: String,
        /// Exception class reported by the daemon.
        exception: String,
        /// Exception message reported by the daemon.
        message: String,
    },
    /// The daemon raised an exception while handling a call.
    #[error("daemon returned an error")]
    Remote {
        /// Method that raised.
        method: String,
        /// Exception class reported by the daemon.
        exception: String,
        /// Exception message reported by the daemon.
        message: String,
    },
    /// The daemon answered with a value of an unexpected shape.
    #[error("unexpected response shape")]
    UnexpectedResponse {
        /// Method whose response was malformed.
        method: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
}

impl RpcError {
    /// Whether the error indicates the daemon refused the connection outright.
    #[must_use]
    pub const fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }

    /// Whether the error marks a lost connection that survived a reconnect attempt.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }

    /// Whether the error came from the transport and warrants dropping the session.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Timeout { .. })
    }

    /// Whether the daemon broke framing rules, leaving the stream unusable.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    pub(crate) fn lost(method: &str, source: Self) -> Self {
        Self::ConnectionLost {
            method: method.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) const fn protocol(reason: &'static str, detail: Option<String>) -> Self {
        Self::Protocol { reason, detail }
    }
}

impl From<CodecError> for RpcError {
    fn from(source: CodecError) -> Self {
        Self::Codec { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn rpc_error_messages_are_constant() {
        let cases = vec![
            (
                RpcError::ConnectionRefused {
                    address: "127.0.0.1:58846".into(),
                },
                "connection refused by daemon",
                false,
            ),
            (
                RpcError::Io {
                    operation: "read_header",
                    source: io::Error::other("io"),
                },
                "transport io failure",
                true,
            ),
            (
                RpcError::lost(
                    "core.get_session_state",
                    RpcError::ConnectionRefused {
                        address: "127.0.0.1:58846".into(),
                    },
                ),
                "connection to daemon lost",
                true,
            ),
            (
                RpcError::Remote {
                    method: "core.pause_torrent".into(),
                    exception: "InvalidTorrentError".into(),
                    message: "torrent_id not in session".into(),
                },
                "daemon returned an error",
                false,
            ),
            (
                RpcError::from(CodecError::TrailingBytes { offset: 4 }),
                "message codec failure",
                true,
            ),
        ];

        for (err, message, has_source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.source().is_some(), has_source);
        }
    }

    #[test]
    fn classification_helpers() {
        let refused = RpcError::ConnectionRefused {
            address: "daemon:58846".into(),
        };
        assert!(refused.is_connection_refused());
        assert!(!refused.is_transport_failure());

        let timeout = RpcError::Timeout {
            method: "core.get_config_value".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(timeout.is_transport_failure());
        assert!(!timeout.is_connection_lost());

        let lost = RpcError::lost("core.get_config_value", timeout);
        assert!(lost.is_connection_lost());
        assert!(!lost.is_transport_failure());
    }
}
