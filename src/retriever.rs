//! The retrieval pipeline: validate → exchange token → fetch messages → scan for code.

use crate::config::RetrieverConfig;
use crate::credentials::Credentials;
use crate::error::{Error, Outcome, Result};
use crate::extractor::extract_code;
use crate::mailbox::{ImapMailbox, MailboxFetch};
use crate::token::{TokenExchange, TokenExchanger};
use tracing::{debug, info, instrument, warn};

/// Retrieves the newest verification code from an Outlook/Office365 mailbox.
///
/// Each call is independent: one token exchange, one mailbox session, no caching
/// and no retries. The retriever itself holds no per-call state, so it can be shared
/// across tasks and called concurrently.
///
/// # Example
///
/// ```no_run
/// use outlook_code::{Credentials, RetrieverConfig, VerificationCodeRetriever};
///
/// # async fn example() -> outlook_code::Result<()> {
/// let retriever = VerificationCodeRetriever::new(RetrieverConfig::default())?;
/// let credentials = Credentials::new("user@outlook.com", "client-id", "refresh-token");
///
/// let code = retriever.retrieve(&credentials).await?;
/// println!("Got code: {code}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VerificationCodeRetriever<T = TokenExchanger, M = ImapMailbox> {
    tokens: T,
    mailbox: M,
    max_messages: usize,
}

impl VerificationCodeRetriever {
    /// Creates a retriever that talks to the configured token endpoint and IMAP server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the HTTP client cannot be constructed.
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        let tokens = TokenExchanger::new(&config)?;
        let max_messages = config.max_messages;

        Ok(Self {
            tokens,
            mailbox: ImapMailbox::new(config),
            max_messages,
        })
    }
}

impl<T: TokenExchange, M: MailboxFetch> VerificationCodeRetriever<T, M> {
    /// Assembles a retriever from explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_messages` is zero.
    pub fn with_components(tokens: T, mailbox: M, max_messages: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(Error::InvalidConfig {
                message: "max_messages must be at least 1".into(),
            });
        }

        Ok(Self {
            tokens,
            mailbox,
            max_messages,
        })
    }

    /// Runs one retrieval and returns the code.
    ///
    /// Messages are scanned newest first and the first code found wins.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingParameters`] / [`Error::InvalidMailbox`] before any network call
    /// - token errors ([`Error::TokenRejected`], [`Error::TokenRequest`], ...) without
    ///   opening a mail session
    /// - session errors from connecting, opening, searching, or fetching
    /// - [`Error::NoMessagesFound`] if the mailbox yielded no parsed messages
    /// - [`Error::CodeNotFound`] if no scanned message carried a code
    ///
    /// Use [`Error::kind`] or [`Error::to_failure`] to classify the result.
    #[instrument(
        name = "VerificationCodeRetriever::retrieve",
        skip_all,
        fields(mailbox = %credentials.mailbox(), max_messages = self.max_messages)
    )]
    pub async fn retrieve(&self, credentials: &Credentials) -> Result<String> {
        credentials.validate()?;

        let access_token = self
            .tokens
            .exchange(credentials.client_id(), credentials.refresh_token())
            .await?;

        let messages = self
            .mailbox
            .fetch_recent_messages(credentials.mailbox(), &access_token, self.max_messages)
            .await?;
        drop(access_token);

        if messages.is_empty() {
            return Err(Error::NoMessagesFound);
        }

        for (position, message) in messages.iter().enumerate() {
            if let Some(code) = extract_code(&message.body) {
                info!(position, sender = %message.sender, "Verification code found");
                return Ok(code.to_string());
            }
            debug!(position, sender = %message.sender, "No code in message");
        }

        Err(Error::CodeNotFound {
            scanned: messages.len(),
        })
    }

    /// Runs one retrieval and normalizes the result into an [`Outcome`].
    ///
    /// This is the shape an adapter layer consumes: the code, or a [`Failure`](crate::Failure)
    /// carrying its kind and message.
    pub async fn retrieve_outcome(&self, credentials: &Credentials) -> Outcome {
        self.retrieve(credentials).await.map_err(|e| {
            let failure = e.to_failure();
            warn!(kind = %failure.kind, error = %failure.message, "Verification code retrieval failed");
            failure
        })
    }
}
