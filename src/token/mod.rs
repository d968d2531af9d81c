//! Access token lifecycle.
//!
//! [`TokenProvider`] exchanges a signed service account assertion for a short-lived
//! OAuth 2.0 access token and keeps the result in memory. A cached token is handed
//! out until it comes within [`REFRESH_BUFFER_SECS`] of its expiry; after that the next
//! caller refreshes it.
//!
//! Refreshes are single-flight: when several requests find the cache stale at the same
//! time, one of them performs the exchange and the others wait for and reuse its result.
//!
//! The provider trusts the lifetime it asked for ([`ASSERTION_LIFETIME_SECS`]) and ignores
//! any `expires_in` the authorization server returns.

pub mod assertion;


pub use self::assertion::{AssertionClaims, ASSERTION_LIFETIME_SECS};

use crate::core::{fingerprint, Clock, SystemClock};
use crate::credentials::{CredentialError, CredentialSource, ServiceAccountCredential};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, RwLock};

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// A cached token is only returned while it has more than this many seconds left.
pub const REFRESH_BUFFER_SECS: i64 = 300;

pub const DEFAULT_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/datastore",
    "https://www.googleapis.com/auth/firebase",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Errors that can occur while obtaining an access token.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The service account could not be loaded.
    #[error(transparent)]
    Configuration(#[from] CredentialError),
    #[error("Failed to sign assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid token response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    /// The authorization server answered without an access token.
    #[error("Failed to get access token ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },
}

impl TokenError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// A bearer token and the absolute time (seconds since epoch) it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: i64,
}

impl AccessToken {
    /// Seconds left at `now`. Negative once expired.
    pub fn expires_in(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + REFRESH_BUFFER_SECS
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &fingerprint(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn detail(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => format!("{}: {}", error, description),
            (Some(error), None) => error.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => "response did not contain an access token".to_string(),
        }
    }
}

/// Builder for [`TokenProvider`].
pub struct TokenProviderBuilder {
    source: CredentialSource,
    token_uri: String,
    scopes: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl TokenProviderBuilder {
    /// Sets the authorization server endpoint. It is also the assertion audience.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> TokenProvider {
        TokenProvider {
            source: self.source,
            credential: OnceCell::new(),
            token_uri: self.token_uri,
            scopes: self.scopes,
            client: Client::new(),
            clock: self.clock,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }
}

/// Issues and caches access tokens for one service account.
pub struct TokenProvider {
    source: CredentialSource,
    credential: OnceCell<ServiceAccountCredential>,
    token_uri: String,
    scopes: Vec<String>,
    client: Client,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    /// Starts a provider for the Google authorization server with the default scopes.
    pub fn builder(source: CredentialSource) -> TokenProviderBuilder {
        TokenProviderBuilder {
            source,
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Returns a token that stays valid for at least [`REFRESH_BUFFER_SECS`], refreshing
    /// the cache first if needed.
    pub async fn get_token(&self) -> Result<AccessToken, TokenError> {
        if let Some(token) = self.fresh_cached(self.clock.now()).await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited for the lock.
        let now = self.clock.now();
        if let Some(token) = self.fresh_cached(now).await {
            debug!("Reusing token refreshed by a concurrent request");
            return Ok(token);
        }

        let token = self.refresh(now).await?;
        *self.cache.write().await = Some(token.clone());
        Ok(token)
    }

    /// The cached token, if any, without refreshing it.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cache.read().await.clone()
    }

    /// Current time according to the provider's clock.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    async fn fresh_cached(&self, now: i64) -> Option<AccessToken> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(now))
            .cloned()
    }

    async fn credential(&self) -> Result<&ServiceAccountCredential, CredentialError> {
        self.credential
            .get_or_try_init(|| async {
                let credential = self.source.load().await?;
                info!("Loaded service account {}", credential.client_email);
                Ok::<_, CredentialError>(credential)
            })
            .await
    }

    async fn refresh(&self, now: i64) -> Result<AccessToken, TokenError> {
        let credential = self.credential().await?;

        let claims = AssertionClaims::new(&credential.client_email, &self.scopes, &self.token_uri, now);
        let assertion = assertion::sign(credential, &claims)?;

        debug!("Requesting access token from {}", self.token_uri);
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&body)?;

        match parsed.access_token {
            Some(token) => {
                let token = AccessToken {
                    token,
                    expires_at: now + ASSERTION_LIFETIME_SECS,
                };
                info!(
                    "Obtained access token {} valid until {}",
                    fingerprint(&token.token),
                    token.expires_at
                );
                Ok(token)
            }
            None => {
                let detail = parsed.detail();
                warn!("Token endpoint returned {} without a token: {}", status, detail);
                Err(TokenError::Rejected { status, detail })
            }
        }
    }
}
