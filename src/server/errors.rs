use crate::firestore::FirestoreError;
use crate::token::TokenError;
use axum::extract::rejection::PathRejection;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;

pub const ROUTE_NOT_FOUND: &str = "Route not found";

#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a message and status code
    pub fn new<S: ToString>(message: S, status_code: StatusCode) -> Self {
        Self {
            message: message.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a message
    pub fn internal<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400) with a message
    pub fn bad_request<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn route_not_found() -> Self {
        Self::new(ROUTE_NOT_FOUND, StatusCode::NOT_FOUND)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.body_text(), rejection.status())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        Self::internal(err)
    }
}

impl From<FirestoreError> for ApiError {
    fn from(err: FirestoreError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status_code.is_server_error() {
            log::error!("Error: {}", self.message);
        }
        (self.status_code, Json(json!({ "error": self.message }))).into_response()
    }
}
