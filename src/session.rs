//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling and exposes
//! them through [`MailProtocol`], the seam the mailbox state machine drives.

use crate::connection::TlsStream;
use crate::error::{Error, Result};
use crate::token::AccessToken;
use crate::xoauth2::XOAuth2;
use async_imap::Session;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt::Debug;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Fetch query: whole RFC 822 message without setting `\Seen`.
const FETCH_QUERY: &str = "(UID BODY.PEEK[])";

/// One FETCH response, detached from the connection buffer.
#[derive(Debug, Clone)]
pub(crate) struct RawMessage {
    pub uid: Option<u32>,
    pub body: Option<Vec<u8>>,
}

/// The IMAP commands a mailbox session needs, in the order it issues them.
pub(crate) trait MailProtocol: Send {
    /// Opens `mailbox` read-only (`EXAMINE`).
    fn open_read_only(&mut self, mailbox: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns every UID in the open mailbox (`UID SEARCH ALL`).
    fn search_all(&mut self) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Issues one `UID FETCH` for `uid_set` and streams the responses.
    fn fetch_bodies<'a>(
        &'a mut self,
        uid_set: &'a str,
    ) -> impl Future<Output = Result<BoxStream<'a, Result<RawMessage>>>> + Send;

    /// Ends the session (`LOGOUT`).
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Reads the server greeting and authenticates with XOAUTH2.
#[instrument(name = "session::authenticate", skip_all, fields(mailbox = %user))]
pub(crate) async fn authenticate<S>(
    stream: S,
    target: &str,
    user: &str,
    access_token: &AccessToken,
) -> Result<Session<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    let mut client = async_imap::Client::new(stream);

    // authenticate() expects the next line to be a continuation, so the
    // untagged greeting has to be consumed first
    match client.read_response().await {
        Some(Ok(_greeting)) => debug!("Received server greeting"),
        None => {
            return Err(Error::Greeting {
                target: target.to_string(),
                message: "connection closed before greeting".into(),
            })
        }
        Some(Err(e)) => {
            return Err(Error::Greeting {
                target: target.to_string(),
                message: e.to_string(),
            })
        }
    }

    debug!("Authenticating with XOAUTH2");

    client
        .authenticate("XOAUTH2", XOAuth2::new(user, access_token))
        .await
        .map_err(|(source, _client)| Error::ImapLogin {
            mailbox: user.to_string(),
            source,
        })
}

impl<S> MailProtocol for Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    #[instrument(name = "session::examine", skip(self))]
    async fn open_read_only(&mut self, mailbox: &str) -> Result<()> {
        let opened = self
            .examine(mailbox)
            .await
            .map_err(|source| Error::SelectMailbox {
                mailbox: mailbox.to_string(),
                source,
            })?;

        debug!(exists = opened.exists, "Mailbox opened read-only");
        Ok(())
    }

    #[instrument(name = "session::search_all", skip(self))]
    async fn search_all(&mut self) -> Result<Vec<u32>> {
        let uids = self
            .uid_search("ALL")
            .await
            .map_err(|source| Error::ImapSearch { source })?;

        debug!(uid_count = uids.len(), "Search complete");
        Ok(uids.into_iter().collect())
    }

    async fn fetch_bodies<'a>(
        &'a mut self,
        uid_set: &'a str,
    ) -> Result<BoxStream<'a, Result<RawMessage>>> {
        debug!(uid_set = %uid_set, "Fetching messages");

        let stream = self
            .uid_fetch(uid_set, FETCH_QUERY)
            .await
            .map_err(|source| Error::ImapFetch {
                uid_set: uid_set.to_string(),
                source,
            })?;

        Ok(stream
            .map(|item| {
                item.map(|fetch| RawMessage {
                    uid: fetch.uid,
                    body: fetch.body().map(<[u8]>::to_vec),
                })
                .map_err(|source| Error::FetchMessage { source })
            })
            .boxed())
    }

    #[instrument(name = "session::logout", skip(self))]
    async fn close(&mut self) -> Result<()> {
        self.logout()
            .await
            .map_err(|source| Error::ImapLogout { source })
    }
}
