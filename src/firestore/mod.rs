//! Cloud Firestore module.
//!
//! A thin client over the Firestore REST API that hands the upstream status code and
//! JSON body back to the caller instead of interpreting them. Requests are authorized
//! by [`AuthMiddleware`], which pulls bearer tokens from the shared [`TokenProvider`].
//!
//! No retry middleware is installed: a failed call fails the inbound request.

pub mod models;
pub mod reference;

#[cfg(test)]
mod tests;

use self::reference::{CollectionReference, DocumentReference};
use crate::core::middleware::AuthMiddleware;
use crate::token::{TokenError, TokenProvider};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub const FIRESTORE_V1_API: &str = "https://firestore.googleapis.com/v1";

/// Errors that can occur during Firestore operations.
///
/// A non-success answer from Firestore is not an error here; it comes back as a
/// [`StoreResponse`] carrying the upstream status.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// No access token could be attached to the request.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Any other failure raised inside the middleware stack.
    #[error("Middleware error: {0}")]
    MiddlewareError(anyhow::Error),
    /// The response body was not JSON.
    #[error("Invalid response from Firestore ({status}): {source}")]
    InvalidResponse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
    /// The configured API URL cannot be used as a base.
    #[error("Invalid Firestore URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest_middleware::Error> for FirestoreError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::RequestError(e),
            reqwest_middleware::Error::Middleware(e) => match e.downcast::<TokenError>() {
                Ok(token_err) => Self::Token(token_err),
                Err(e) => Self::MiddlewareError(e),
            },
        }
    }
}

/// Status and JSON body of a Firestore response, relayed as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl StoreResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client for interacting with Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl FirebaseFirestore {
    /// Creates a client for the `(default)` database of `project_id` under `api_url`.
    ///
    /// # Arguments
    ///
    /// * `api_url` - The API root, e.g. `https://firestore.googleapis.com/v1`.
    /// * `project_id` - The Google Cloud project that owns the database.
    pub fn new_with_url(
        provider: Arc<TokenProvider>,
        api_url: &str,
        project_id: &str,
    ) -> Result<Self, FirestoreError> {
        let client = ClientBuilder::new(Client::new())
            .with(AuthMiddleware::new(provider))
            .build();

        let base_url = documents_url(api_url, project_id)?;
        log::debug!("Firestore documents root: {}", base_url);

        Ok(Self { client, base_url })
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Gets a `CollectionReference` for a top-level collection.
    ///
    /// # Arguments
    ///
    /// * `collection_id` - The ID of the collection (e.g., "users").
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'_> {
        CollectionReference::new(&self.client, reference::child_url(&self.base_url, collection_id))
    }

    /// Gets a `DocumentReference` for `document_id` inside `collection_id`.
    pub fn doc(&self, collection_id: &str, document_id: &str) -> DocumentReference<'_> {
        self.collection(collection_id).doc(document_id)
    }
}

fn documents_url(api_url: &str, project_id: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(api_url)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", "(default)", "documents"]);
    Ok(url)
}
