use crate::credentials::ServiceAccountCredential;
use jsonwebtoken::{encode, Algorithm, Header};
use serde::{Deserialize, Serialize};

/// Lifetime requested for every assertion, and assumed for the token it buys.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of a JWT-bearer assertion (RFC 7523) for a Google service account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(issuer: &str, scopes: &[String], audience: &str, now: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            scope: scopes.join(" "),
            aud: audience.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Signs the claims with the service account key using RS256.
pub fn sign(
    credential: &ServiceAccountCredential,
    claims: &AssertionClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = credential.private_key_id.clone();
    encode(&header, claims, credential.signing_key())
}
