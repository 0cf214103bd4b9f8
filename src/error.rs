//! Error types for the outlook-code crate.
//!
//! Every stage of the pipeline reports failures through [`Error`]. Each variant maps
//! to exactly one [`FailureKind`] (see [`Error::kind`]), and [`Error::to_failure`]
//! flattens any error into the single [`Failure`] shape that an adapter layer
//! translates into a response.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal value of one retrieval call: the extracted code, or a normalized failure.
pub type Outcome = std::result::Result<String, Failure>;

/// Errors that can occur while retrieving a verification code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Input / configuration errors
    // ─────────────────────────────────────────────────────────────────────────
    /// One or more required credential fields are absent or empty.
    #[error("missing required parameters: {fields}")]
    MissingParameters {
        /// Comma-separated names of the missing fields.
        fields: String,
    },

    /// The mailbox identity is not a valid email address.
    #[error("invalid mailbox address: {mailbox}")]
    InvalidMailbox {
        /// The rejected mailbox identity.
        mailbox: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Token exchange errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The HTTP client for the token endpoint could not be built.
    #[error("failed to build token endpoint client")]
    HttpClient {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The token request failed in transport or returned an undecodable body.
    #[error("token request failed, check network or credentials")]
    TokenRequest {
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered with an OAuth2 error.
    #[error("token endpoint rejected the refresh token: {error} {description}")]
    TokenRejected {
        /// OAuth2 error code (e.g. `invalid_grant`).
        error: String,
        /// Provider-supplied description, possibly empty.
        description: String,
    },

    /// The token endpoint answered with neither a token nor an error.
    #[error("malformed token response: {message}")]
    TokenResponse {
        /// What was wrong with the response.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Session login errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The server greeting was missing or unreadable.
    #[error("no IMAP greeting from {target}: {message}")]
    Greeting {
        /// The target address.
        target: String,
        /// What went wrong while reading the greeting.
        message: String,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {mailbox} after {timeout:?}")]
    AuthTimeout {
        /// The mailbox used for authentication.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// XOAUTH2 authentication was refused.
    #[error("login failed for {mailbox}")]
    ImapLogin {
        /// The mailbox used for login.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// The mailbox could not be opened after login (disabled or abnormal account).
    #[error("login failed, account abnormal: cannot open '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Mailbox open timeout.
    #[error("timeout opening '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Session search / fetch errors
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP search failed.
    #[error("mail search failed")]
    ImapSearch {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP search timeout.
    #[error("mail search timeout after {timeout:?}")]
    SearchTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The FETCH command could not be issued.
    #[error("mail fetch failed for UID set {uid_set}")]
    ImapFetch {
        /// The UID set that failed.
        uid_set: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// The FETCH response stream broke mid-transfer.
    #[error("mail fetch failed while streaming messages")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Message fetch timeout.
    #[error("mail fetch timeout for UID set {uid_set} after {timeout:?}")]
    FetchTimeout {
        /// The UID set being fetched.
        uid_set: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The whole mailbox session ran past its deadline and was force-closed.
    #[error("mailbox session exceeded its deadline of {timeout:?}")]
    CallDeadline {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Content errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The mailbox produced no parsed messages.
    #[error("no messages found")]
    NoMessagesFound,

    /// None of the candidate messages contained a verification code.
    #[error("verification code not found in {scanned} message(s)")]
    CodeNotFound {
        /// How many messages were scanned.
        scanned: usize,
    },
}

impl Error {
    /// Classifies this error into the caller-facing taxonomy.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::MissingParameters { .. }
            | Error::InvalidMailbox { .. }
            | Error::InvalidConfig { .. } => FailureKind::MissingParameters,

            Error::HttpClient { .. }
            | Error::TokenRequest { .. }
            | Error::TokenRejected { .. }
            | Error::TokenResponse { .. } => FailureKind::TokenExchangeFailed,

            Error::InvalidDnsName { .. }
            | Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::Greeting { .. }
            | Error::AuthTimeout { .. }
            | Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::SelectTimeout { .. } => FailureKind::SessionLoginFailed,

            Error::ImapSearch { .. } | Error::SearchTimeout { .. } => {
                FailureKind::SessionSearchFailed
            }

            Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::FetchTimeout { .. }
            | Error::CallDeadline { .. }
            | Error::ImapLogout { .. } => FailureKind::SessionFetchFailed,

            Error::NoMessagesFound => FailureKind::NoMessagesFound,
            Error::CodeNotFound { .. } => FailureKind::CodeNotFound,
        }
    }

    /// Returns `true` if this error represents a transient failure that might succeed
    /// on a later call.
    ///
    /// The crate never retries on its own; this is advice for the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TokenRequest { .. }
            | Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::Greeting { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::ImapSearch { .. }
            | Error::SearchTimeout { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::FetchTimeout { .. }
            | Error::CallDeadline { .. } => true,

            // Rejected credentials and abnormal accounts need caller action first
            Error::MissingParameters { .. }
            | Error::InvalidMailbox { .. }
            | Error::InvalidConfig { .. }
            | Error::HttpClient { .. }
            | Error::TokenRejected { .. }
            | Error::TokenResponse { .. }
            | Error::InvalidDnsName { .. }
            | Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapLogout { .. }
            | Error::NoMessagesFound
            | Error::CodeNotFound { .. } => false,
        }
    }

    /// Normalizes this error into the [`Failure`] shape, including its source chain
    /// in the message.
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Failure {
            kind: self.kind(),
            message,
        }
    }
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        error.to_failure()
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        error.to_failure()
    }
}

/// Caller-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Required input was absent, empty, or malformed.
    MissingParameters,
    /// The OAuth2 provider rejected the request or could not be reached.
    TokenExchangeFailed,
    /// TLS, authentication, or mailbox-open failure.
    SessionLoginFailed,
    /// Search failed after a successful login.
    SessionSearchFailed,
    /// Fetch failed after a successful search.
    SessionFetchFailed,
    /// The mailbox had no candidate messages.
    NoMessagesFound,
    /// Candidate messages were scanned but none carried a code.
    CodeNotFound,
}

impl FailureKind {
    /// Returns `true` for the session-level kinds that together mean "mail fetch failed".
    #[must_use]
    pub fn is_mail_fetch_failure(self) -> bool {
        matches!(
            self,
            FailureKind::SessionLoginFailed
                | FailureKind::SessionSearchFailed
                | FailureKind::SessionFetchFailed
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::MissingParameters => write!(f, "missing_parameters"),
            FailureKind::TokenExchangeFailed => write!(f, "token_exchange_failed"),
            FailureKind::SessionLoginFailed => write!(f, "session_login_failed"),
            FailureKind::SessionSearchFailed => write!(f, "session_search_failed"),
            FailureKind::SessionFetchFailed => write!(f, "session_fetch_failed"),
            FailureKind::NoMessagesFound => write!(f, "no_messages_found"),
            FailureKind::CodeNotFound => write!(f, "code_not_found"),
        }
    }
}

/// The single error shape surfaced to an adapter layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Classification of the failure.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
