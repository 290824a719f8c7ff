#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! File-backed configuration for the Sluice host and CLI.
//!
//! Layout: `model.rs` (typed documents), `defaults.rs` (fallback values),
//! `loader.rs` (file and environment loading), `validate.rs` (field rules),
//! `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_from_path, parse_document};
pub use model::{DelugeConfig, HostSettings, LogFormatSetting, LoggingSettings, SluiceConfig};
pub use validate::validate;
