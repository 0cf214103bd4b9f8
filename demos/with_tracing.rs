//! Example: Using tracing for observability.
//!
//! This example demonstrates how to enable structured logging using
//! the `tracing` ecosystem. Every step of a retrieval (token exchange,
//! TLS connect, XOAUTH2, search, fetch, logout) emits tracing spans and events.
//!
//! # Usage
//!
//! ```bash
//! export OUTLOOK_MAILBOX="user@outlook.com"
//! export OUTLOOK_CLIENT_ID="00000000-0000-0000-0000-000000000000"
//! export OUTLOOK_REFRESH_TOKEN="M.C5xx..."
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=outlook_code=debug
//!
//! cargo run --example with_tracing
//! ```

use outlook_code::{Credentials, RetrieverConfig, VerificationCodeRetriever};
use std::env;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> outlook_code::Result<()> {
    // Initialize tracing subscriber with environment filter
    // Example: RUST_LOG=outlook_code=debug,info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("outlook_code=info")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let mailbox = env::var("OUTLOOK_MAILBOX").expect("OUTLOOK_MAILBOX environment variable required");
    let client_id =
        env::var("OUTLOOK_CLIENT_ID").expect("OUTLOOK_CLIENT_ID environment variable required");
    let refresh_token = env::var("OUTLOOK_REFRESH_TOKEN")
        .expect("OUTLOOK_REFRESH_TOKEN environment variable required");

    tracing::info!(mailbox = %mailbox, "Starting outlook-code example");

    let config = RetrieverConfig::builder()
        .connect_timeout(Duration::from_secs(20))
        .call_deadline(Duration::from_secs(60))
        .build()?;

    tracing::debug!("Configuration built successfully");

    let retriever = VerificationCodeRetriever::new(config)?;
    let credentials = Credentials::new(mailbox, client_id, refresh_token);

    match retriever.retrieve_outcome(&credentials).await {
        Ok(code) => {
            tracing::info!(code = %code, "Found verification code");
            println!("\nFound code: {code}");
        }
        Err(failure) => {
            tracing::warn!(kind = %failure.kind, error = %failure.message, "No code retrieved");
            println!("\nNo code: {failure}");
        }
    }

    tracing::info!("Example completed");

    Ok(())
}
