#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (config and payload builders), mocks.rs (scripted daemon doubles).

pub mod fixtures;
pub mod mocks;

pub use mocks::{RecordedCall, ScriptedClient, ScriptedConnector};
