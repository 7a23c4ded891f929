#![cfg(not(tarpaulin_include))]

use popyramid::app;
use std::env;

/// Main entry point for the population pyramid web application
///
/// # Arguments
/// * Optional first argument: address to listen on (default `127.0.0.1:3000`)
///
/// # Logging
/// * Controlled by `RUST_LOG`; defaults to `info`
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| app::DEFAULT_ADDR.to_string());

    log::info!("Starting population pyramid server on {}", addr);
    app::run(&addr).await
}
