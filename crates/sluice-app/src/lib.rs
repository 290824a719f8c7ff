#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Sluice host runtime.
//!
//! Layout: `bootstrap.rs` (config, logging, and signal wiring), `host.rs`
//! (`Host` and `HostHandle`), `worker.rs` (setup retry and poll loop),
//! `command.rs` (worker commands), `error.rs` (`HostError`, `AppError`).

/// Application bootstrap and dependency wiring.
pub mod bootstrap;
mod command;
/// Host and worker error types.
pub mod error;
/// Host lifecycle and the command handle.
pub mod host;
mod worker;

pub use bootstrap::{config_path, connector_for, logging_config, run_app};
pub use error::{AppError, AppResult, HostError, HostResult};
pub use host::{Host, HostHandle};
