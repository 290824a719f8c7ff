#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Remote-procedure-call client for the Deluge torrent daemon.
//!
//! Layout: `rencode.rs` (value codec), `wire.rs` (framing and request/reply
//! exchange), `tls.rs` (self-signed certificate handling), `client.rs`
//! (`DelugeRpcClient` and `DelugeConnector`), `error.rs` (`RpcError`).

pub mod client;
pub mod error;
pub mod rencode;
mod tls;
mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{ConnectionSettings, DelugeConnector, DelugeRpcClient};
pub use error::{CodecError, RpcError, RpcResult};
pub use wire::{MAX_BODY_LEN, PROTOCOL_VERSION};

/// Shared handle used to invoke named methods on the daemon.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Invoke `method` with positional `args` and return the daemon's reply.
    ///
    /// Implementations report a dropped transport that could not be re-established
    /// as [`RpcError::ConnectionLost`].
    async fn call(&self, method: &str, args: Vec<Value>) -> RpcResult<Value>;
}

/// Factory that opens a connected [`RemoteClient`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open and authenticate a new connection.
    async fn connect(&self) -> RpcResult<Arc<dyn RemoteClient>>;

    /// `host:port` of the daemon this connector targets.
    fn address(&self) -> String;
}
