//! Configuration for the verification code retriever.
//!
//! The defaults target Microsoft's consumer and work accounts, so most callers only
//! need [`RetrieverConfig::default`]. Use [`RetrieverConfigBuilder`] to point at a
//! different endpoint or to tighten timeouts:
//!
//! ```
//! use outlook_code::RetrieverConfig;
//! use std::time::Duration;
//!
//! let config = RetrieverConfig::builder()
//!     .connect_timeout(Duration::from_secs(20))
//!     .call_deadline(Duration::from_secs(90))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.server_address(), "outlook.office365.com:993");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// OAuth2 token endpoint for Microsoft identity platform accounts.
pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// IMAP host for Outlook/Office365 mailboxes.
pub const DEFAULT_IMAP_HOST: &str = "outlook.office365.com";

/// IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Mailbox scanned for verification messages.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Number of most recent messages inspected per call.
pub const DEFAULT_MAX_MESSAGES: usize = 2;

/// Configuration for one [`VerificationCodeRetriever`](crate::VerificationCodeRetriever).
///
/// Create using [`RetrieverConfig::builder()`] or [`RetrieverConfig::default()`].
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// OAuth2 token endpoint used for the refresh-token grant.
    pub token_url: Url,
    /// IMAP server hostname (also used for TLS SNI).
    pub imap_host: String,
    /// IMAP server port.
    pub imap_port: u16,
    /// Mailbox opened read-only for the search.
    pub mailbox: String,
    /// How many of the newest messages are fetched and scanned.
    pub max_messages: usize,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Upper bound on the whole mailbox session, from TCP connect to logout.
    pub call_deadline: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            imap_host: DEFAULT_IMAP_HOST.to_string(),
            imap_port: DEFAULT_IMAP_PORT,
            mailbox: DEFAULT_MAILBOX.to_string(),
            max_messages: DEFAULT_MAX_MESSAGES,
            timeouts: TimeoutConfig::default(),
            call_deadline: Duration::from_secs(180),
        }
    }
}

/// Timeout configuration for each network step.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for the token endpoint request.
    pub token: Duration,
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for reading the greeting and completing XOAUTH2.
    pub auth: Duration,
    /// Timeout for opening the mailbox.
    pub select: Duration,
    /// Timeout for the UID search.
    pub search: Duration,
    /// Timeout for fetching message bodies.
    pub fetch: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            token: Duration::from_secs(30),
            connect: Duration::from_secs(60),
            auth: Duration::from_secs(60),
            select: Duration::from_secs(30),
            search: Duration::from_secs(30),
            fetch: Duration::from_secs(60),
            logout: Duration::from_secs(5),
        }
    }
}

impl RetrieverConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> RetrieverConfigBuilder {
        RetrieverConfigBuilder::default()
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.imap_host, self.imap_port)
    }
}

#[allow(clippy::expect_used)]
fn default_token_url() -> Url {
    Url::parse(DEFAULT_TOKEN_URL).expect("default token URL is valid")
}

/// Builder for [`RetrieverConfig`].
#[derive(Debug, Default)]
pub struct RetrieverConfigBuilder {
    token_url: Option<String>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    mailbox: Option<String>,
    max_messages: Option<usize>,
    timeouts: Option<TimeoutConfig>,
    call_deadline: Option<Duration>,
}

impl RetrieverConfigBuilder {
    /// Sets the OAuth2 token endpoint.
    #[must_use]
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Sets the IMAP server hostname.
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets the mailbox to scan.
    #[must_use]
    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = Some(mailbox.into());
        self
    }

    /// Sets how many of the newest messages are scanned.
    #[must_use]
    pub fn max_messages(mut self, count: usize) -> Self {
        self.max_messages = Some(count);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets the authentication timeout.
    #[must_use]
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .auth = timeout;
        self
    }

    /// Sets the token request timeout.
    #[must_use]
    pub fn token_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .token = timeout;
        self
    }

    /// Sets the whole-session deadline.
    #[must_use]
    pub fn call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = Some(deadline);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the token URL does not parse, the host or
    /// mailbox is empty, the port is zero, or `max_messages` is zero.
    pub fn build(self) -> Result<RetrieverConfig> {
        let defaults = RetrieverConfig::default();

        let token_url = match self.token_url {
            Some(raw) => Url::parse(&raw).map_err(|e| Error::InvalidConfig {
                message: format!("token_url '{raw}' is not a valid URL: {e}"),
            })?,
            None => defaults.token_url,
        };

        let imap_host = self.imap_host.unwrap_or(defaults.imap_host);
        if imap_host.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "imap_host must not be empty".into(),
            });
        }

        let imap_port = self.imap_port.unwrap_or(defaults.imap_port);
        if imap_port == 0 {
            return Err(Error::InvalidConfig {
                message: "imap_port must not be 0".into(),
            });
        }

        let mailbox = self.mailbox.unwrap_or(defaults.mailbox);
        if mailbox.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "mailbox must not be empty".into(),
            });
        }

        let max_messages = self.max_messages.unwrap_or(defaults.max_messages);
        if max_messages == 0 {
            return Err(Error::InvalidConfig {
                message: "max_messages must be at least 1".into(),
            });
        }

        Ok(RetrieverConfig {
            token_url,
            imap_host,
            imap_port,
            mailbox,
            max_messages,
            timeouts: self.timeouts.unwrap_or_default(),
            call_deadline: self.call_deadline.unwrap_or(defaults.call_deadline),
        })
    }
}
