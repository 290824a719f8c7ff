#![forbid(unsafe_code)]

//! Thin entrypoint for `sluice-cli`.

#[tokio::main]
async fn main() {
    let code = sluice_cli::run().await;
    std::process::exit(code);
}
