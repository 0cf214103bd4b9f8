//! Mailbox session lifecycle: connect, open read-only, search, fetch, close.
//!
//! A [`MailboxSession`] walks `Connecting → Ready → Searching → Fetching → Closed`.
//! Each step is gated on the previous one and bounded by its own timeout. Whatever
//! happens after login (success, empty mailbox, search failure, fetch failure) the
//! session is closed exactly once before the result is returned.
//!
//! Fetched messages are joined through a [`FetchBarrier`]: every selected message
//! must end up either parsed or counted as a failure before the session closes, and
//! parsed records are kept in selection order (newest first) no matter in which order
//! the server streams them.

use crate::config::{RetrieverConfig, TimeoutConfig};
use crate::connection;
use crate::error::{Error, Result};
use crate::parser::{self, ParsedMessage};
use crate::session::{self, MailProtocol, RawMessage};
use crate::token::AccessToken;
use futures::StreamExt;
use std::future::Future;
use tracing::{debug, instrument, warn};

/// Lifecycle states of one mailbox session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP/TLS connection and XOAUTH2 in progress.
    Connecting,
    /// Authenticated, nothing opened yet.
    Ready,
    /// Mailbox open, searching for identifiers.
    Searching,
    /// Message bodies in flight.
    Fetching,
    /// Logged out (or connection abandoned). Terminal.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Searching => write!(f, "searching"),
            SessionState::Fetching => write!(f, "fetching"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Fetches the most recent messages of a mailbox as parsed records.
///
/// Implemented by [`ImapMailbox`]; tests substitute their own implementation.
pub trait MailboxFetch: Send + Sync {
    /// Logs in as `mailbox` (an email address) and returns up to `max_count` of the
    /// newest messages, newest first.
    ///
    /// An empty mailbox is `Ok(vec![])`, not an error.
    fn fetch_recent_messages(
        &self,
        mailbox: &str,
        access_token: &AccessToken,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<ParsedMessage>>> + Send;
}

/// [`MailboxFetch`] over IMAP-over-TLS with XOAUTH2, one fresh session per call.
#[derive(Debug, Clone)]
pub struct ImapMailbox {
    config: RetrieverConfig,
}

impl ImapMailbox {
    /// Creates a fetcher for the configured server.
    #[must_use]
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }
}

impl MailboxFetch for ImapMailbox {
    #[instrument(
        name = "ImapMailbox::fetch_recent_messages",
        skip_all,
        fields(
            mailbox = %mailbox,
            imap_host = %self.config.imap_host,
            max_count
        )
    )]
    async fn fetch_recent_messages(
        &self,
        mailbox: &str,
        access_token: &AccessToken,
        max_count: usize,
    ) -> Result<Vec<ParsedMessage>> {
        let deadline = self.config.call_deadline;

        // Dropping the inner future on expiry drops the socket with it
        tokio::time::timeout(deadline, async {
            let session = connect(&self.config, mailbox, access_token).await?;
            session.fetch_recent(&self.config.mailbox, max_count).await
        })
        .await
        .map_err(|_| {
            warn!(deadline_secs = deadline.as_secs(), "Mailbox session deadline exceeded");
            Error::CallDeadline { timeout: deadline }
        })?
    }
}

/// Opens the TLS connection and authenticates, yielding a `Ready` session.
async fn connect(
    config: &RetrieverConfig,
    mailbox: &str,
    access_token: &AccessToken,
) -> Result<MailboxSession<session::ImapSession>> {
    let timeouts = &config.timeouts;
    let target = config.server_address();

    debug!(state = %SessionState::Connecting, %target, "Connecting");

    let tls_stream = tokio::time::timeout(
        timeouts.connect,
        connection::connect_tls(&config.imap_host, config.imap_port),
    )
    .await
    .map_err(|_| Error::ConnectTimeout {
        target: target.clone(),
        timeout: timeouts.connect,
    })??;

    let imap = tokio::time::timeout(
        timeouts.auth,
        session::authenticate(tls_stream, &target, mailbox, access_token),
    )
    .await
    .map_err(|_| Error::AuthTimeout {
        mailbox: mailbox.to_string(),
        timeout: timeouts.auth,
    })??;

    Ok(MailboxSession::new(imap, timeouts.clone()))
}

/// One authenticated connection, driven through its lifecycle.
pub(crate) struct MailboxSession<P> {
    protocol: P,
    state: SessionState,
    timeouts: TimeoutConfig,
}

impl<P: MailProtocol> MailboxSession<P> {
    /// Wraps an authenticated protocol connection.
    pub(crate) fn new(protocol: P, timeouts: TimeoutConfig) -> Self {
        debug!(state = %SessionState::Ready, "Session ready");
        Self {
            protocol,
            state: SessionState::Ready,
            timeouts,
        }
    }

    /// Runs open → search → fetch, then closes the session on every path.
    #[instrument(name = "MailboxSession::fetch_recent", skip(self))]
    pub(crate) async fn fetch_recent(
        mut self,
        mailbox: &str,
        max_count: usize,
    ) -> Result<Vec<ParsedMessage>> {
        let result = self.run(mailbox, max_count).await;
        if let Err(e) = &result {
            debug!(state = %self.state, error = %e, "Session step failed");
        }
        self.close().await;
        result
    }

    async fn run(&mut self, mailbox: &str, max_count: usize) -> Result<Vec<ParsedMessage>> {
        self.open(mailbox).await?;
        let uids = self.search().await?;

        let selected = select_recent(&uids, max_count);
        if selected.is_empty() {
            debug!("Mailbox is empty");
            return Ok(Vec::new());
        }

        self.fetch(&selected).await
    }

    async fn open(&mut self, mailbox: &str) -> Result<()> {
        let timeout = self.timeouts.select;
        tokio::time::timeout(timeout, self.protocol.open_read_only(mailbox))
            .await
            .map_err(|_| Error::SelectTimeout {
                mailbox: mailbox.to_string(),
                timeout,
            })??;

        self.transition(SessionState::Searching);
        Ok(())
    }

    async fn search(&mut self) -> Result<Vec<u32>> {
        let timeout = self.timeouts.search;
        tokio::time::timeout(timeout, self.protocol.search_all())
            .await
            .map_err(|_| Error::SearchTimeout { timeout })?
    }

    /// Fetches `selected` (newest first) in one command and joins the results.
    async fn fetch(&mut self, selected: &[u32]) -> Result<Vec<ParsedMessage>> {
        self.transition(SessionState::Fetching);

        let uid_set = selected
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let timeout = self.timeouts.fetch;
        let mut barrier = FetchBarrier::new(selected.len());

        let protocol = &mut self.protocol;
        let barrier_ref = &mut barrier;
        let uid_set_ref = uid_set.as_str();
        let drain = async move {
            let mut responses = protocol.fetch_bodies(uid_set_ref).await?;
            // Drain to the tagged completion so the connection stays in sync for LOGOUT
            while let Some(response) = responses.next().await {
                settle(barrier_ref, selected, response?);
            }
            Ok::<(), Error>(())
        };

        tokio::time::timeout(timeout, drain)
            .await
            .map_err(|_| Error::FetchTimeout {
                uid_set: uid_set.clone(),
                timeout,
            })??;

        let missing = barrier.settle_remaining();
        if missing > 0 {
            warn!(missing, uid_set = %uid_set, "Server omitted messages from FETCH response");
        }

        debug!(
            parsed = barrier.parsed_count(),
            failed = barrier.failed_count(),
            "All fetched messages accounted for"
        );
        Ok(barrier.into_messages())
    }

    /// Logs out at most once. Errors are logged, never surfaced.
    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transition(SessionState::Closed);

        let timeout = self.timeouts.logout;
        match tokio::time::timeout(timeout, self.protocol.close()).await {
            Ok(Ok(())) => debug!("Session closed"),
            Ok(Err(e)) => warn!(error = %e, "Logout failed"),
            Err(_) => warn!(timeout_secs = timeout.as_secs(), "Logout timed out"),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }
}

/// Routes one FETCH response into the barrier slot of its selection index.
fn settle(barrier: &mut FetchBarrier, selected: &[u32], response: RawMessage) {
    let Some(index) = response
        .uid
        .and_then(|uid| selected.iter().position(|s| *s == uid))
    else {
        debug!(uid = ?response.uid, "Ignoring FETCH response for unrequested UID");
        return;
    };
    let uid = selected[index];

    let Some(body) = response.body else {
        warn!(uid, "Message has no body");
        barrier.record_failure(index);
        return;
    };

    match parser::parse_message(&body) {
        Ok(message) => {
            debug!(uid, sender = %message.sender, "Parsed message");
            barrier.record_parsed(index, message);
        }
        Err(e) => {
            warn!(uid, error = %e, "Failed to parse email, skipping message");
            barrier.record_failure(index);
        }
    }
}

/// Picks the newest `max_count` identifiers and orders them newest first.
pub(crate) fn select_recent(uids: &[u32], max_count: usize) -> Vec<u32> {
    let mut sorted = uids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let start = sorted.len().saturating_sub(max_count);
    sorted[start..].iter().rev().copied().collect()
}

#[derive(Debug)]
enum Slot {
    Pending,
    Parsed(ParsedMessage),
    Failed,
}

/// Counted join over a batch of in-flight messages.
///
/// Holds one slot per selected message, indexed by selection order. A slot settles
/// exactly once, either with a parsed record or as a failure; the batch is complete
/// when the settled count reaches the batch size.
///
/// ```
/// use outlook_code::{FetchBarrier, ParsedMessage};
///
/// let mut barrier = FetchBarrier::new(2);
/// // the older message (index 1) finishes first
/// barrier.record_parsed(1, ParsedMessage::new("a", "older"));
/// assert!(!barrier.is_complete());
/// barrier.record_parsed(0, ParsedMessage::new("b", "newer"));
/// assert!(barrier.is_complete());
///
/// let bodies: Vec<_> = barrier.into_messages().into_iter().map(|m| m.body).collect();
/// assert_eq!(bodies, ["newer", "older"]);
/// ```
#[derive(Debug)]
pub struct FetchBarrier {
    slots: Vec<Slot>,
    settled: usize,
}

impl FetchBarrier {
    /// Creates a barrier expecting `expected` messages.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            slots: (0..expected).map(|_| Slot::Pending).collect(),
            settled: 0,
        }
    }

    /// Records a parsed message for slot `index`.
    ///
    /// Returns `false` (and changes nothing) if the slot is out of range or already settled.
    pub fn record_parsed(&mut self, index: usize, message: ParsedMessage) -> bool {
        self.settle(index, Slot::Parsed(message))
    }

    /// Records a parse or transfer failure for slot `index`.
    ///
    /// Returns `false` (and changes nothing) if the slot is out of range or already settled.
    pub fn record_failure(&mut self, index: usize) -> bool {
        self.settle(index, Slot::Failed)
    }

    /// Marks every still-pending slot as failed and returns how many there were.
    pub fn settle_remaining(&mut self) -> usize {
        let mut count = 0;
        for slot in &mut self.slots {
            if matches!(slot, Slot::Pending) {
                *slot = Slot::Failed;
                count += 1;
            }
        }
        self.settled += count;
        count
    }

    /// Returns `true` once every slot has settled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.settled == self.slots.len()
    }

    /// Number of slots holding a parsed record.
    #[must_use]
    pub fn parsed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Parsed(_)))
            .count()
    }

    /// Number of slots settled as failures.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Failed))
            .count()
    }

    /// Consumes the barrier, returning parsed records in slot order.
    #[must_use]
    pub fn into_messages(self) -> Vec<ParsedMessage> {
        self.slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Parsed(message) => Some(message),
                Slot::Pending | Slot::Failed => None,
            })
            .collect()
    }

    fn settle(&mut self, index: usize, outcome: Slot) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if matches!(slot, Slot::Pending) => {
                *slot = outcome;
                self.settled += 1;
                true
            }
            _ => false,
        }
    }
}
