//! Integration tests for outlook-code.
//!
//! The offline tests run against local stand-ins for the token endpoint and the mail
//! server. The live tests need a real Outlook/Office365 mailbox and are disabled by
//! default. To run them:
//!
//! ```bash
//! # Set environment variables (or put them in .env)
//! export OUTLOOK_CODE_TEST_MAILBOX="user@outlook.com"
//! export OUTLOOK_CODE_TEST_CLIENT_ID="00000000-0000-0000-0000-000000000000"
//! export OUTLOOK_CODE_TEST_REFRESH_TOKEN="M.C5xx..."
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```

use outlook_code::{
    Credentials, Error, FailureKind, RetrieverConfig, VerificationCodeRetriever,
};
use std::env;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_credentials() -> Option<Credentials> {
    dotenvy::dotenv().ok();
    let mailbox = env::var("OUTLOOK_CODE_TEST_MAILBOX").ok()?;
    let client_id = env::var("OUTLOOK_CODE_TEST_CLIENT_ID").ok()?;
    let refresh_token = env::var("OUTLOOK_CODE_TEST_REFRESH_TOKEN").ok()?;
    Some(Credentials::new(mailbox, client_id, refresh_token))
}

fn credentials() -> Credentials {
    Credentials::new("user@outlook.com", "client-id", "refresh-token")
}

/// A local port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Answers every HTTP request on a local port with the same JSON body.
async fn token_endpoint(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let Ok(n) = socket.read(&mut buf).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request_complete(&request) {
                        break;
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            });
        }
    });

    format!("http://{addr}/token")
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= end + 4 + content_length
}

fn retriever(token_url: &str, imap_port: u16) -> VerificationCodeRetriever {
    let config = RetrieverConfig::builder()
        .token_url(token_url)
        .imap_host("127.0.0.1")
        .imap_port(imap_port)
        .build()
        .expect("valid config");
    VerificationCodeRetriever::new(config).expect("retriever")
}

// ─────────────────────────────────────────────────────────────────────────────
// Input Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_required_fields() {
    // Both endpoints are unreachable, so any network attempt would change the kind
    let retriever = retriever("http://127.0.0.1:9/token", closed_port().await);

    let failure = retriever
        .retrieve_outcome(&Credentials::new("user@outlook.com", "   ", ""))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::MissingParameters);
    assert!(failure.message.contains("client_id"));
    assert!(failure.message.contains("refresh_token"));
    assert!(!failure.message.contains("mailbox"));
}

#[tokio::test]
async fn test_invalid_email_format() {
    let retriever = retriever("http://127.0.0.1:9/token", closed_port().await);

    let err = retriever
        .retrieve(&Credentials::new("not-an-email", "client-id", "refresh-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidMailbox { .. }));
    assert_eq!(err.kind(), FailureKind::MissingParameters);
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = RetrieverConfig::builder().token_url("::not a url::").build();
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Exchange Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_token_error_never_opens_mail_session() {
    let token_url = token_endpoint(
        "400 Bad Request",
        r#"{"error":"invalid_grant","error_description":"AADSTS70008: The refresh token has expired."}"#,
    )
    .await;

    // A mail session attempt against a closed port would surface as SessionLoginFailed
    let retriever = retriever(&token_url, closed_port().await);
    let failure = retriever.retrieve_outcome(&credentials()).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::TokenExchangeFailed);
    assert!(failure.message.contains("invalid_grant"));
    assert!(failure.message.contains("AADSTS70008"));
}

#[tokio::test]
async fn test_unreachable_token_endpoint() {
    let token_url = format!("http://127.0.0.1:{}/token", closed_port().await);
    let retriever = retriever(&token_url, closed_port().await);

    let err = retriever.retrieve(&credentials()).await.unwrap_err();

    assert!(matches!(err, Error::TokenRequest { .. }));
    assert_eq!(err.kind(), FailureKind::TokenExchangeFailed);
    assert!(err.is_retryable());
}

// ─────────────────────────────────────────────────────────────────────────────
// Mail Session Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refused_imap_connection_is_login_failure() {
    let token_url = token_endpoint("200 OK", r#"{"access_token":"at-123","token_type":"Bearer"}"#).await;
    let retriever = retriever(&token_url, closed_port().await);

    let failure = retriever.retrieve_outcome(&credentials()).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::SessionLoginFailed);
    assert!(failure.kind.is_mail_fetch_failure());
}

#[tokio::test]
async fn test_silent_server_hits_call_deadline() {
    let token_url = token_endpoint("200 OK", r#"{"access_token":"at-123"}"#).await;

    // Accepts connections and never says a word
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let imap_port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = RetrieverConfig::builder()
        .token_url(token_url)
        .imap_host("127.0.0.1")
        .imap_port(imap_port)
        .call_deadline(Duration::from_millis(500))
        .build()
        .unwrap();
    let retriever = VerificationCodeRetriever::new(config).unwrap();

    let started = Instant::now();
    let err = retriever.retrieve(&credentials()).await.unwrap_err();

    assert!(matches!(err, Error::CallDeadline { .. }));
    assert_eq!(err.kind(), FailureKind::SessionFetchFailed);
    assert!(started.elapsed() < Duration::from_secs(10));
}

// ─────────────────────────────────────────────────────────────────────────────
// Live Mailbox Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real Outlook mailbox"]
async fn test_retrieve_from_live_mailbox() {
    let credentials = get_test_credentials().expect("Test credentials from environment variables");
    let retriever = VerificationCodeRetriever::new(RetrieverConfig::default()).unwrap();

    match retriever.retrieve_outcome(&credentials).await {
        Ok(code) => {
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            println!("Found code: {code}");
        }
        Err(failure) => {
            // An inbox without a recent code is fine; anything else is not
            assert!(
                matches!(
                    failure.kind,
                    FailureKind::NoMessagesFound | FailureKind::CodeNotFound
                ),
                "unexpected failure: {failure}"
            );
        }
    }
}

#[tokio::test]
#[ignore = "requires real Outlook mailbox"]
async fn test_live_retrieval_is_idempotent() {
    let credentials = get_test_credentials().expect("Test credentials from environment variables");
    let retriever = VerificationCodeRetriever::new(RetrieverConfig::default()).unwrap();

    let first = retriever.retrieve_outcome(&credentials).await;
    let second = retriever.retrieve_outcome(&credentials).await;

    // Reading must not change what the next call sees
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_revoked_refresh_token() {
    dotenvy::dotenv().ok();
    let mailbox = env::var("OUTLOOK_CODE_TEST_MAILBOX").expect("OUTLOOK_CODE_TEST_MAILBOX");
    let client_id = env::var("OUTLOOK_CODE_TEST_CLIENT_ID").expect("OUTLOOK_CODE_TEST_CLIENT_ID");

    let retriever = VerificationCodeRetriever::new(RetrieverConfig::default()).unwrap();
    let failure = retriever
        .retrieve_outcome(&Credentials::new(mailbox, client_id, "revoked-refresh-token"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::TokenExchangeFailed);
    println!("Token error: {failure}");
}
