pub mod middleware;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Source of the current time in whole seconds since the Unix epoch.
///
/// Token expiry bookkeeping goes through this trait so that the refresh
/// window can be exercised without waiting on a real clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorResponse {
    pub error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

impl FirebaseErrorResponse {
    pub fn display_message(&self) -> String {
        match &self.error.status {
            Some(status) => format!("{} ({}, code: {})", self.error.message, status, self.error.code),
            None => format!("{} (code: {})", self.error.message, self.error.code),
        }
    }
}

/// Extracts a human readable message from a Google API error body, if it has one.
pub fn describe_error(body: &serde_json::Value) -> Option<String> {
    FirebaseErrorResponse::deserialize(body)
        .ok()
        .map(|response| response.display_message())
}

/// Short, non-reversible identifier for a bearer token, safe to put in logs.
pub(crate) fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
