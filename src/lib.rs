pub mod config;
pub mod core;
pub mod credentials;
pub mod firestore;
pub mod server;
pub mod token;

#[cfg(test)]
mod test_utils;

use config::Settings;
use firestore::{FirebaseFirestore, FirestoreError, FIRESTORE_V1_API};
use std::sync::Arc;
use token::TokenProvider;

/// Wires one [`TokenProvider`] into the Firestore client that depends on it.
pub struct FirebaseApp {
    tokens: Arc<TokenProvider>,
    project_id: String,
    firestore_api_url: String,
}

impl FirebaseApp {
    pub fn new(tokens: Arc<TokenProvider>, project_id: impl Into<String>) -> Self {
        Self {
            tokens,
            project_id: project_id.into(),
            firestore_api_url: FIRESTORE_V1_API.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let tokens = TokenProvider::builder(settings.credentials.clone())
            .with_token_uri(settings.token_uri.clone())
            .build();

        Self::new(Arc::new(tokens), settings.project_id.clone())
            .with_firestore_api_url(settings.firestore_api_url.clone())
    }

    pub fn with_firestore_api_url(mut self, url: impl Into<String>) -> Self {
        self.firestore_api_url = url.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn token_provider(&self) -> Arc<TokenProvider> {
        self.tokens.clone()
    }

    pub fn firestore(&self) -> Result<FirebaseFirestore, FirestoreError> {
        FirebaseFirestore::new_with_url(self.tokens.clone(), &self.firestore_api_url, &self.project_id)
    }
}
