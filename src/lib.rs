//! # outlook-code
//!
//! Async retrieval of numeric verification codes from Outlook/Office365 mailboxes.
//!
//! One call runs the whole pipeline:
//! - Exchange an OAuth2 refresh token for an access token
//! - Open an IMAP-over-TLS session authenticated with SASL XOAUTH2
//! - Open the inbox read-only, search it, and fetch the two newest messages
//! - Parse each message (HTML body preferred over plain text)
//! - Scan newest first for the code following "enter the following code"
//!
//! Nothing is cached or persisted between calls, and nothing is retried.
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed tracing.
//!   Without this feature, tracing spans are still emitted but require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outlook_code::{Credentials, RetrieverConfig, VerificationCodeRetriever};
//!
//! # async fn example() -> outlook_code::Result<()> {
//! let retriever = VerificationCodeRetriever::new(RetrieverConfig::default())?;
//!
//! let credentials = Credentials::new(
//!     "user@outlook.com",
//!     "00000000-0000-0000-0000-000000000000",
//!     "M.C5xx_refresh_token",
//! );
//!
//! let code = retriever.retrieve(&credentials).await?;
//! println!("Got code: {code}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is an [`Error`]. [`Error::kind`] classifies it into a [`FailureKind`],
//! and [`Error::to_failure`] flattens it into the one [`Failure`] shape an adapter layer
//! turns into a response:
//!
//! ```
//! use outlook_code::{Error, FailureKind};
//!
//! let error = Error::CodeNotFound { scanned: 2 };
//! let failure = error.to_failure();
//!
//! assert_eq!(failure.kind, FailureKind::CodeNotFound);
//! assert!(!error.is_retryable());
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All major operations emit spans with
//! structured fields suitable for distributed tracing.
//!
//! ### Span Naming Convention
//!
//! - `VerificationCodeRetriever::retrieve` - One retrieval call
//! - `token::exchange` - Refresh-token grant
//! - `ImapMailbox::fetch_recent_messages` - One mailbox session
//! - `connection::connect_tls` - TCP and TLS connection
//! - `session::authenticate` - XOAUTH2 authentication
//! - `MailboxSession::fetch_recent` - Open, search, fetch, close
//!
//! ### Standard Fields
//!
//! - `mailbox` - Mailbox identity (email address)
//! - `imap_host` - IMAP server hostname
//! - `token_url` - OAuth2 token endpoint
//! - `uid` - Message UID
//!
//! Access and refresh tokens are never recorded.
//!
//! Enable the `observability` feature for OpenTelemetry integration; it adds
//! `observability::layer` to plug the spans into an OTEL tracer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod mailbox;
#[cfg(feature = "observability")]
pub mod observability;
pub mod token;

// Internal modules
mod connection;
mod parser;
mod retriever;
mod session;
mod xoauth2;

// Re-exports for ergonomic API
pub use config::{RetrieverConfig, RetrieverConfigBuilder, TimeoutConfig};
pub use credentials::Credentials;
pub use error::{Error, Failure, FailureKind, Outcome, Result};
pub use extractor::{extract_code, CODE_PATTERN};
pub use mailbox::{FetchBarrier, ImapMailbox, MailboxFetch, SessionState};
pub use parser::{ParsedMessage, NO_CONTENT, UNKNOWN_SENDER};
pub use retriever::VerificationCodeRetriever;
pub use token::{AccessToken, TokenExchange, TokenExchanger};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // Ensure all public types are accessible
        let _ = RetrieverConfig::builder();
        let _ = Credentials::new("user@outlook.com", "client-id", "refresh-token");
        let _ = FetchBarrier::new(2);
        assert_eq!(SessionState::Closed.to_string(), "closed");
        assert!(extract_code("").is_none());
    }

    #[test]
    fn test_default_retriever_builds() {
        assert!(VerificationCodeRetriever::new(RetrieverConfig::default()).is_ok());
    }
}
