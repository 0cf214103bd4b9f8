//! Per-call credentials supplied by the caller.

use crate::error::{Error, Result};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};

/// Mailbox identity and OAuth2 refresh credentials for one retrieval call.
///
/// The refresh token is held as a [`SecretString`] so it never shows up in `Debug`
/// output or logs.
///
/// # Example
///
/// ```
/// use outlook_code::Credentials;
///
/// let credentials = Credentials::new("user@outlook.com", "client-id", "refresh-token");
/// assert!(credentials.validate().is_ok());
///
/// let missing = Credentials::new("user@outlook.com", "", "refresh-token");
/// assert!(missing.validate().is_err());
/// ```
#[derive(Clone)]
pub struct Credentials {
    mailbox: String,
    client_id: String,
    refresh_token: SecretString,
}

impl Credentials {
    /// Creates credentials. Nothing is checked until [`validate`](Self::validate).
    #[must_use]
    pub fn new(
        mailbox: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            mailbox: mailbox.into(),
            client_id: client_id.into(),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }

    /// Returns the mailbox identity used as the XOAUTH2 user.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the OAuth2 client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    /// Checks that every field is present and the mailbox is a valid address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameters`] naming every blank field, or
    /// [`Error::InvalidMailbox`] if the mailbox identity is not an email address.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("mailbox", self.mailbox.as_str()),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", self.refresh_token.expose_secret()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::MissingParameters {
                fields: missing.join(", "),
            });
        }

        if !EmailAddress::is_valid(self.mailbox.trim()) {
            return Err(Error::InvalidMailbox {
                mailbox: self.mailbox.clone(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("mailbox", &self.mailbox)
            .field("client_id", &self.client_id)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_credentials_are_valid() {
        let credentials = Credentials::new("user@outlook.com", "client", "refresh");
        assert!(credentials.validate().is_ok());
    }

    #[test]
    fn test_each_blank_field_is_reported() {
        let err = Credentials::new("", "client", "refresh")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameters { ref fields } if fields == "mailbox"));

        let err = Credentials::new("user@outlook.com", "  ", "")
            .validate()
            .unwrap_err();
        assert!(
            matches!(err, Error::MissingParameters { ref fields } if fields == "client_id, refresh_token")
        );
    }

    #[test]
    fn test_malformed_mailbox_is_rejected() {
        let err = Credentials::new("not-an-address", "client", "refresh")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMailbox { .. }));
    }

    #[test]
    fn test_refresh_token_not_in_debug() {
        let credentials = Credentials::new("user@outlook.com", "client", "super-secret-refresh");
        let debug_str = format!("{credentials:?}");

        assert!(!debug_str.contains("super-secret-refresh"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
