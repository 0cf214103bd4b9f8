//! Example: Retrieve a verification code, retrying transient failures.
//!
//! The crate makes a single attempt per call. This example shows how a caller can
//! layer its own retry policy on top using [`Error::is_retryable`].
//!
//! # Usage
//!
//! ```bash
//! export OUTLOOK_MAILBOX="user@outlook.com"
//! export OUTLOOK_CLIENT_ID="00000000-0000-0000-0000-000000000000"
//! export OUTLOOK_REFRESH_TOKEN="M.C5xx..."
//! cargo run --example retrieve_code
//! ```

use outlook_code::{Credentials, Error, RetrieverConfig, VerificationCodeRetriever};
use std::env;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

async fn retrieve_with_retry(
    retriever: &VerificationCodeRetriever,
    credentials: &Credentials,
) -> Result<String, Error> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        println!("Attempt {attempt}/{MAX_ATTEMPTS}...");

        match retriever.retrieve(credentials).await {
            Ok(code) => return Ok(code),
            Err(e) => {
                println!("  Error: {e}");
                println!("  Kind: {}", e.kind());
                println!("  Retryable: {}", e.is_retryable());

                if !e.is_retryable() || attempt == MAX_ATTEMPTS {
                    return Err(e);
                }

                println!("  Retrying in {backoff:?}...");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let mailbox = env::var("OUTLOOK_MAILBOX").expect("OUTLOOK_MAILBOX environment variable required");
    let client_id =
        env::var("OUTLOOK_CLIENT_ID").expect("OUTLOOK_CLIENT_ID environment variable required");
    let refresh_token = env::var("OUTLOOK_REFRESH_TOKEN")
        .expect("OUTLOOK_REFRESH_TOKEN environment variable required");

    let retriever = VerificationCodeRetriever::new(RetrieverConfig::default())
        .expect("default configuration is valid");
    let credentials = Credentials::new(mailbox, client_id, refresh_token);

    match retrieve_with_retry(&retriever, &credentials).await {
        Ok(code) => println!("\nVerification code: {code}"),
        Err(e) => {
            let failure = e.to_failure();
            eprintln!("\nFailed ({}): {}", failure.kind, failure.message);
            std::process::exit(1);
        }
    }
}
