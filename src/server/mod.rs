//! HTTP surface of the proxy.
//!
//! Every response carries permissive CORS headers. `OPTIONS` requests are answered with
//! an empty 200 before routing, and any method or path outside the route table gets
//! a 404 `{"error": "Route not found"}`.

pub mod errors;
pub mod handlers;


use crate::firestore::{FirebaseFirestore, FirestoreError};
use crate::token::TokenProvider;
use crate::FirebaseApp;
use axum::{
    extract::Request,
    http::{header::HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenProvider>,
    pub firestore: FirebaseFirestore,
}

impl AppState {
    pub fn new(tokens: Arc<TokenProvider>, firestore: FirebaseFirestore) -> Self {
        Self { tokens, firestore }
    }

    pub fn from_app(app: &FirebaseApp) -> Result<Self, FirestoreError> {
        Ok(Self::new(app.token_provider(), app.firestore()?))
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let routes = Router::new().route(
        "/",
        get(handlers::health).fallback(handlers::route_not_found),
    );
    let routes = route_with_trailing_slash(
        routes,
        "/health",
        get(handlers::health).fallback(handlers::route_not_found),
    );
    let routes = route_with_trailing_slash(
        routes,
        "/api/token",
        get(handlers::token).fallback(handlers::route_not_found),
    );
    let routes = route_with_trailing_slash(
        routes,
        "/api/firestore/{collection}",
        get(handlers::list_documents).fallback(handlers::route_not_found),
    );
    let routes = route_with_trailing_slash(
        routes,
        "/api/firestore/{collection}/{document_id}",
        get(handlers::get_document)
            .post(handlers::upsert_document)
            .delete(handlers::delete_document)
            .fallback(handlers::route_not_found),
    );

    routes
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(answer_options))
        .layer(cors_layer())
        .with_state(state)
}

// Paths match with or without one trailing slash.
fn route_with_trailing_slash(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{}/", path), method_router)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers([
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("accept-version"),
            HeaderName::from_static("content-length"),
            HeaderName::from_static("content-md5"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("date"),
            HeaderName::from_static("x-api-version"),
        ])
}

// Preflights are answered by the CORS layer; this catches the remaining OPTIONS requests.
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}
