#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Binary entrypoint that loads configuration and runs the host until Ctrl-C.

use sluice_app::{AppResult, run_app};

/// Bootstraps the Sluice host and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
