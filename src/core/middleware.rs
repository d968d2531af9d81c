use crate::token::TokenProvider;
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::sync::Arc;

/// Attaches a bearer token from the shared [`TokenProvider`] to every outgoing request.
#[derive(Clone)]
pub struct AuthMiddleware {
    provider: Arc<TokenProvider>,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        // The token error is carried as-is so callers can downcast it.
        let token = self
            .provider
            .get_token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;

        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token.token))
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
        value.set_sensitive(true);
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
