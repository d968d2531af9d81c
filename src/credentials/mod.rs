//! Service account credentials.
//!
//! A credential is read from an inline JSON document, an environment variable holding
//! that document, or a key file on disk. Once loaded it is never mutated, and its
//! `Debug` output never includes the private key.

use jsonwebtoken::EncodingKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;


/// Errors raised while loading a service account credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("{0} environment variable is not set")]
    MissingEnv(String),
    #[error("Failed to read service account file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid service account JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Service account is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

/// Where the service account JSON comes from.
#[derive(Clone)]
pub enum CredentialSource {
    /// Name of an environment variable whose value is the JSON document.
    Env(String),
    /// Path to a JSON key file.
    File(PathBuf),
    /// The JSON document itself.
    Json(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Json(_) => f.write_str("Json(<redacted>)"),
        }
    }
}

impl CredentialSource {
    /// Reads and validates the credential.
    pub async fn load(&self) -> Result<ServiceAccountCredential, CredentialError> {
        let raw = match self {
            Self::Env(name) => std::env::var(name).map_err(|_| CredentialError::MissingEnv(name.clone()))?,
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CredentialError::Io {
                    path: path.clone(),
                    source,
                })?,
            Self::Json(json) => json.clone(),
        };

        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        ServiceAccountCredential::from_key(key)
    }
}

/// The subset of a Google service account key file this crate reads.
#[derive(Deserialize, Clone, Default)]
pub struct ServiceAccountKey {
    pub private_key_id: Option<String>,
    pub private_key: Option<String>,
    pub client_email: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("client_email", &self.client_email)
            .finish()
    }
}

/// A validated service account, ready to sign assertions.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key_id: Option<String>,
    signing_key: EncodingKey,
}

impl ServiceAccountCredential {
    pub fn from_key(key: ServiceAccountKey) -> Result<Self, CredentialError> {
        let client_email = key
            .client_email
            .filter(|email| !email.is_empty())
            .ok_or(CredentialError::MissingField("client_email"))?;
        let private_key = key
            .private_key
            .filter(|pem| !pem.is_empty())
            .ok_or(CredentialError::MissingField("private_key"))?;

        // Keys pasted into a single-line env var often arrive with escaped newlines.
        let pem = private_key.replace("\\n", "\n");
        validate_rsa_pem(&pem)?;
        let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

        Ok(Self {
            client_email,
            private_key_id: key.private_key_id.filter(|id| !id.is_empty()),
            signing_key,
        })
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

// Accepts PKCS#8 ("BEGIN PRIVATE KEY") and PKCS#1 ("BEGIN RSA PRIVATE KEY").
fn validate_rsa_pem(pem: &str) -> Result<(), CredentialError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map(|_| ())
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem).map(|_| ()))
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))
}
