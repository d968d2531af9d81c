//! Process configuration, read from environment variables.

use crate::credentials::CredentialSource;
use crate::firestore::FIRESTORE_V1_API;
use crate::token::GOOGLE_TOKEN_URI;
use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PROJECT_ID: &str = "nosql-demo-e5885";
pub const DEFAULT_KEY_FILE: &str = "./private-key.json";

/// Inline service account JSON. Takes precedence over the key file.
pub const SERVICE_ACCOUNT_ENV: &str = "FIREBASE_SERVICE_ACCOUNT";
pub const SERVICE_ACCOUNT_FILE_ENV: &str = "FIREBASE_SERVICE_ACCOUNT_FILE";
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const PORT_ENV: &str = "PORT";
pub const FIRESTORE_API_URL_ENV: &str = "FIRESTORE_API_URL";
pub const TOKEN_URI_ENV: &str = "GOOGLE_TOKEN_URI";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP server port
    pub port: u16,
    /// Project whose `(default)` database is proxied
    pub project_id: String,
    /// Where the service account is loaded from on first use
    pub credentials: CredentialSource,
    /// Firestore REST API root
    pub firestore_api_url: String,
    /// OAuth 2.0 token endpoint, also the assertion audience
    pub token_uri: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // Only the variable name is kept; its value is read when the first token is needed.
        let credentials = if var(SERVICE_ACCOUNT_ENV).is_some() {
            CredentialSource::Env(SERVICE_ACCOUNT_ENV.to_string())
        } else {
            CredentialSource::File(PathBuf::from(
                var(SERVICE_ACCOUNT_FILE_ENV).unwrap_or_else(|| DEFAULT_KEY_FILE.to_string()),
            ))
        };

        let port = match var(PORT_ENV) {
            Some(port) => port.parse().with_context(|| format!("Invalid {PORT_ENV}: {port}"))?,
            None => DEFAULT_PORT,
        };

        let firestore_api_url = var(FIRESTORE_API_URL_ENV).unwrap_or_else(|| FIRESTORE_V1_API.to_string());
        Url::parse(&firestore_api_url).with_context(|| format!("Invalid {FIRESTORE_API_URL_ENV}"))?;

        let token_uri = var(TOKEN_URI_ENV).unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string());
        Url::parse(&token_uri).with_context(|| format!("Invalid {TOKEN_URI_ENV}"))?;

        Ok(Self {
            port,
            project_id: var(PROJECT_ID_ENV).unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
            credentials,
            firestore_api_url,
            token_uri,
        })
    }
}
