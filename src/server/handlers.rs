use super::errors::ApiError;
use super::AppState;
use crate::firestore::models::encode_fields;
use crate::firestore::StoreResponse;
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const ENDPOINTS: [&str; 6] = [
    "GET /health",
    "GET /api/token",
    "GET /api/firestore/:collection",
    "GET /api/firestore/:collection/:documentId",
    "POST /api/firestore/:collection/:documentId",
    "DELETE /api/firestore/:collection/:documentId",
];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

fn relay(response: StoreResponse) -> Response {
    (response.status, Json(response.body)).into_response()
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        endpoints: ENDPOINTS.to_vec(),
    })
}

pub(super) async fn token(State(state): State<AppState>) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.get_token().await?;
    let expires_in = token.expires_in(state.tokens.now());

    Ok(Json(TokenResponse {
        access_token: token.token,
        expires_in,
    }))
}

pub(super) async fn list_documents(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(collection) = path?;
    let response = state.firestore.collection(&collection).list_documents().await?;
    Ok(relay(response))
}

pub(super) async fn get_document(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path((collection, document_id)) = path?;
    let response = state.firestore.doc(&collection, &document_id).get().await?;
    Ok(relay(response))
}

pub(super) async fn upsert_document(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Path((collection, document_id)) = path?;
    let object = parse_object(&body)?;
    let fields = encode_fields(&object);

    let response = state
        .firestore
        .doc(&collection, &document_id)
        .patch_fields(&fields)
        .await?;
    Ok(relay(response))
}

pub(super) async fn delete_document(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path((collection, document_id)) = path?;
    let response = state.firestore.doc(&collection, &document_id).delete().await?;

    if response.is_success() {
        return Ok(Json(json!({ "success": true, "message": "Document deleted" })).into_response());
    }
    Ok(relay(response))
}

pub(super) async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

// An empty body is an empty update.
fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(e) => Err(ApiError::bad_request(format!("Invalid JSON body: {}", e))),
    }
}
