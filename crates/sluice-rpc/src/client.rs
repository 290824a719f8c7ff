//! Deluge daemon client over TLS.
//!
//! # Design
//! - One session per client; calls are serialized through an async mutex.
//! - A transport failure drops the session and triggers exactly one reconnect
//!   (TCP, TLS, login) followed by a single re-issue of the call. If either step
//!   fails the caller sees `RpcError::ConnectionLost`.
//! - Daemon exceptions and malformed replies never trigger a reconnect.
//! - A protocol violation drops the session without re-issuing the call; the
//!   next call opens a fresh connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, info, warn};

use crate::error::{RpcError, RpcResult};
use crate::{Connector, RemoteClient, tls, wire};

const LOGIN_METHOD: &str = "daemon.login";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Address, credentials, and timeout used to reach a daemon.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Daemon host name or IP literal.
    pub host: String,
    /// Daemon RPC port.
    pub port: u16,
    /// Daemon account name.
    pub username: String,
    /// Daemon account password.
    pub password: String,
    /// Upper bound for connecting and for each request/response exchange.
    pub timeout: Duration,
}

impl ConnectionSettings {
    /// Render the `host:port` pair used in logs and errors.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

struct Session {
    stream: TlsStream<TcpStream>,
    next_request_id: i64,
}

impl Session {
    async fn call(
        &mut self,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        limit: Duration,
    ) -> RpcResult<Value> {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        timeout(
            limit,
            wire::exchange(&mut self.stream, request_id, method, args, kwargs),
        )
        .await
        .map_err(|_| RpcError::Timeout {
            method: method.to_string(),
            timeout: limit,
        })?
    }
}

/// Connected client for a single Deluge daemon.
pub struct DelugeRpcClient {
    settings: ConnectionSettings,
    tls: TlsConnector,
    session: Mutex<Option<Session>>,
}

impl DelugeRpcClient {
    /// Prepare a client without opening a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration cannot be built.
    pub fn new(settings: ConnectionSettings) -> RpcResult<Self> {
        Ok(Self {
            settings,
            tls: tls::daemon_connector()?,
            session: Mutex::new(None),
        })
    }

    /// Open the connection and log in, replacing any existing session.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionRefused` when nothing listens on the daemon port, and
    /// other variants for TLS, timeout, or authentication failures.
    pub async fn connect(&self) -> RpcResult<()> {
        let session = self.establish().await?;
        *self.session.lock().await = Some(session);
        info!(address = %self.settings.address(), "connected to deluge daemon");
        Ok(())
    }

    /// Settings this client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    async fn establish(&self) -> RpcResult<Session> {
        let address = self.settings.address();
        let limit = self.settings.timeout;

        let tcp = timeout(
            limit,
            TcpStream::connect((self.settings.host.as_str(), self.settings.port)),
        )
        .await
        .map_err(|_| RpcError::Timeout {
            method: "connect".to_string(),
            timeout: limit,
        })?
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::ConnectionRefused {
                RpcError::ConnectionRefused {
                    address: address.clone(),
                }
            } else {
                RpcError::Connect {
                    address: address.clone(),
                    source,
                }
            }
        })?;

        let server_name = tls::server_name(&self.settings.host)?;
        let stream = timeout(limit, self.tls.connect(server_name, tcp))
            .await
            .map_err(|_| RpcError::Timeout {
                method: "tls_handshake".to_string(),
                timeout: limit,
            })?
            .map_err(|source| RpcError::Tls {
                address: address.clone(),
                source,
            })?;

        let mut session = Session {
            stream,
            next_request_id: 0,
        };
        let mut kwargs = Map::new();
        kwargs.insert("client_version".to_string(), json!(CLIENT_VERSION));
        let credentials = vec![
            json!(self.settings.username),
            json!(self.settings.password),
        ];
        match session.call(LOGIN_METHOD, credentials, kwargs, limit).await {
            Ok(level) => {
                debug!(address = %address, auth_level = %level, "daemon login accepted");
                Ok(session)
            }
            Err(RpcError::Remote {
                exception, message, ..
            }) => Err(RpcError::AuthenticationFailed {
                username: self.settings.username.clone(),
                exception,
                message,
            }),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl RemoteClient for DelugeRpcClient {
    async fn call(&self, method: &str, args: Vec<Value>) -> RpcResult<Value> {
        let limit = self.settings.timeout;
        let mut guard = self.session.lock().await;

        let first_attempt = match guard.as_mut() {
            Some(session) => Some(session.call(method, args.clone(), Map::new(), limit).await),
            None => None,
        };
        match first_attempt {
            Some(Err(err)) if err.is_transport_failure() => {
                warn!(method, error = %err, "daemon transport failed; reconnecting");
                *guard = None;
            }
            Some(Err(err)) if err.is_protocol_violation() => {
                warn!(method, error = %err, "daemon stream desynchronised; dropping session");
                *guard = None;
                return Err(err);
            }
            Some(outcome) => return outcome,
            None => debug!(method, "no daemon session; reconnecting"),
        }

        let mut session = self
            .establish()
            .await
            .map_err(|err| RpcError::lost(method, err))?;
        let outcome = session.call(method, args, Map::new(), limit).await;
        match outcome {
            Err(err) if err.is_transport_failure() => Err(RpcError::lost(method, err)),
            Err(err) if err.is_protocol_violation() => Err(err),
            other => {
                *guard = Some(session);
                other
            }
        }
    }
}

/// Connector that opens a fresh [`DelugeRpcClient`] per setup attempt.
#[derive(Debug, Clone)]
pub struct DelugeConnector {
    settings: ConnectionSettings,
}

impl DelugeConnector {
    /// Build a connector for the given daemon settings.
    #[must_use]
    pub const fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for DelugeConnector {
    async fn connect(&self) -> RpcResult<Arc<dyn RemoteClient>> {
        let client = DelugeRpcClient::new(self.settings.clone())?;
        client.connect().await?;
        Ok(Arc::new(client))
    }

    fn address(&self) -> String {
        self.settings.address()
    }
}
