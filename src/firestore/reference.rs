use super::models::{Document, Fields};
use super::{FirestoreError, StoreResponse};
use crate::core::describe_error;
use log::{debug, warn};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use url::Url;

// Appends one percent-encoded path segment.
pub(crate) fn child_url(parent: &Url, segment: &str) -> Url {
    let mut url = parent.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url
}

async fn relay(request: RequestBuilder, operation: &str) -> Result<StoreResponse, FirestoreError> {
    let response = request.send().await?;
    into_store_response(response, operation).await
}

async fn into_store_response(
    response: reqwest::Response,
    operation: &str,
) -> Result<StoreResponse, FirestoreError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|source| FirestoreError::InvalidResponse { status, source })?;

    if status.is_success() {
        debug!("{} succeeded with {}", operation, status);
    } else {
        warn!(
            "{} failed {}: {}",
            operation,
            status,
            describe_error(&body).unwrap_or_else(|| body.to_string())
        );
    }

    Ok(StoreResponse { status, body })
}

#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) url: Url,
}

impl<'a> DocumentReference<'a> {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Reads the document. The body is Firestore's own document representation.
    pub async fn get(&self) -> Result<StoreResponse, FirestoreError> {
        relay(self.client.get(self.url.clone()), "Get document").await
    }

    /// Writes `fields` with PATCH semantics: the listed fields are set, the document is
    /// created if missing, and no full replace is requested.
    pub async fn patch_fields(&self, fields: &Fields) -> Result<StoreResponse, FirestoreError> {
        let document = Document {
            fields: fields.clone(),
        };
        relay(self.client.patch(self.url.clone()).json(&document), "Update document").await
    }

    /// Deletes the document.
    ///
    /// The body of a successful delete is not read; callers only need the status.
    pub async fn delete(&self) -> Result<StoreResponse, FirestoreError> {
        let response = self.client.delete(self.url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!("Delete document succeeded with {}", status);
            return Ok(StoreResponse {
                status,
                body: serde_json::Value::Null,
            });
        }

        into_store_response(response, "Delete document").await
    }
}

#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) url: Url,
}

impl<'a> CollectionReference<'a> {
    pub(crate) fn new(client: &'a ClientWithMiddleware, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        DocumentReference {
            client: self.client,
            url: child_url(&self.url, document_id),
        }
    }

    /// Lists the documents of the collection (first page, Firestore's default size).
    pub async fn list_documents(&self) -> Result<StoreResponse, FirestoreError> {
        relay(self.client.get(self.url.clone()), "List documents").await
    }
}
