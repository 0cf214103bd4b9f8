//! SASL XOAUTH2 credentials for IMAP `AUTHENTICATE`.
//!
//! Wire format: `base64("user=" user "\x01auth=Bearer " token "\x01\x01")`.
//! `async-imap` base64-encodes whatever [`Authenticator::process`] returns, so the
//! authenticator hands over the raw payload.

use crate::token::AccessToken;
use async_imap::Authenticator;
use tracing::debug;

/// Builds the unencoded XOAUTH2 initial response.
pub(crate) fn sasl_payload(user: &str, access_token: &str) -> String {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01")
}

/// One-shot XOAUTH2 authenticator.
///
/// The first challenge is answered with the credential blob. If the server rejects it,
/// it sends a second challenge carrying a JSON error; that one is answered with an empty
/// line so the server can finish the exchange with a tagged `NO`.
pub(crate) struct XOAuth2 {
    payload: String,
    sent: bool,
}

impl XOAuth2 {
    pub(crate) fn new(user: &str, access_token: &AccessToken) -> Self {
        Self {
            payload: sasl_payload(user, access_token.secret()),
            sent: false,
        }
    }
}

impl Authenticator for XOAuth2 {
    type Response = String;

    fn process(&mut self, challenge: &[u8]) -> Self::Response {
        if self.sent {
            debug!(
                challenge = %String::from_utf8_lossy(challenge),
                "XOAUTH2 rejected by server"
            );
            return String::new();
        }
        self.sent = true;
        std::mem::take(&mut self.payload)
    }
}
