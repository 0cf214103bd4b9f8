//! OAuth2 refresh-token grant against the provider's token endpoint.
//!
//! One call, one POST, no retry. The access token that comes back is used
//! immediately for a single mailbox session and then dropped; nothing is cached.

use crate::config::RetrieverConfig;
use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, instrument, warn};
use url::Url;

/// Short-lived bearer credential for one mailbox session.
///
/// Opaque: the value is passed through exactly as the endpoint returned it.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: SecretString,
}

impl AccessToken {
    /// Wraps a raw access token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::from(value.into()),
        }
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }
}

/// Exchanges refresh credentials for an [`AccessToken`].
///
/// Implemented by [`TokenExchanger`]; tests substitute their own implementation.
pub trait TokenExchange: Send + Sync {
    /// Performs one refresh-token grant.
    fn exchange(
        &self,
        client_id: &str,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<AccessToken>> + Send;
}

/// Token endpoint body. Either `access_token` or `error` is expected.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    /// Normalizes the endpoint's answer into a token or a typed error.
    pub(crate) fn into_access_token(self) -> Result<AccessToken> {
        if let Some(error) = self.error {
            return Err(Error::TokenRejected {
                error,
                description: self.error_description.unwrap_or_default(),
            });
        }

        match self.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(Error::TokenResponse {
                message: "response carried neither access_token nor error".into(),
            }),
        }
    }
}

/// HTTPS client for the OAuth2 `refresh_token` grant.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http: reqwest::Client,
    token_url: Url,
}

impl TokenExchanger {
    /// Creates an exchanger for the configured token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the HTTP client cannot be constructed.
    pub fn new(config: &RetrieverConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.token)
            .build()
            .map_err(|source| Error::HttpClient { source })?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
        })
    }

    /// Returns the endpoint this exchanger posts to.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

impl TokenExchange for TokenExchanger {
    #[instrument(
        name = "token::exchange",
        skip_all,
        fields(token_url = %self.token_url, client_id = %client_id)
    )]
    async fn exchange(&self, client_id: &str, refresh_token: &SecretString) -> Result<AccessToken> {
        let form = [
            ("client_id", client_id),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ];

        debug!("Requesting access token");

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|source| Error::TokenRequest { source })?;

        let status = response.status();

        // Error bodies arrive with 4xx statuses, so decode before looking at the status
        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|source| Error::TokenRequest { source })?;

        let token = body.into_access_token();
        match &token {
            Ok(_) => debug!(%status, "Access token received"),
            Err(e) => warn!(%status, error = %e, "Token endpoint refused the grant"),
        }
        token
    }
}
