use super::models::{decode_fields, encode_fields, Document, Value};
use super::*;
use crate::credentials::CredentialSource;
use crate::test_utils::service_account_json;
use httpmock::prelude::*;
use reqwest_middleware::ClientBuilder;
use serde_json::{json, Map, Number};

const DOCUMENTS_PATH: &str = "/v1/projects/test-project/databases/(default)/documents";

fn object(value: serde_json::Value) -> Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn unauthenticated(server: &MockServer) -> FirebaseFirestore {
    let client = ClientBuilder::new(Client::new()).build();
    let base_url = documents_url(&server.url("/v1"), "test-project").unwrap();
    FirebaseFirestore::new_with_client(client, base_url)
}

#[test]
fn test_encode_fields() {
    let fields = encode_fields(&object(json!({ "a": "x", "b": 3, "c": true })));

    assert_eq!(fields.len(), 3);
    assert_eq!(fields["a"], Value::StringValue("x".to_string()));
    assert_eq!(fields["b"], Value::IntegerValue(Number::from(3)));
    assert_eq!(fields["c"], Value::BooleanValue(true));
}

#[test]
fn test_encode_decode_round_trip() {
    let input = object(json!({ "a": "x", "b": 3, "c": true }));
    let decoded = decode_fields(&encode_fields(&input));
    assert_eq!(decoded, input);
}

#[test]
fn test_unsupported_fields_are_dropped() {
    let fields = encode_fields(&object(json!({
        "name": "Ann",
        "address": { "city": "Oslo" },
        "tags": ["a", "b"],
        "nickname": null
    })));

    assert_eq!(fields.len(), 1);
    assert!(fields.contains_key("name"));
}

#[test]
fn test_wire_format() {
    let document = Document {
        fields: encode_fields(&object(json!({ "name": "Ann", "age": 30, "admin": false }))),
    };

    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({
            "fields": {
                "name": { "stringValue": "Ann" },
                "age": { "integerValue": 30 },
                "admin": { "booleanValue": false }
            }
        })
    );
}

#[test]
fn test_decode_firestore_integer_strings() {
    let document: Document = serde_json::from_value(json!({
        "fields": {
            "age": { "integerValue": "30" },
            "score": { "integerValue": 7 }
        }
    }))
    .unwrap();

    assert_eq!(document.fields["age"], Value::IntegerValue(Number::from(30)));
    assert_eq!(decode_fields(&document.fields), object(json!({ "age": 30, "score": 7 })));

    let invalid = serde_json::from_value::<Document>(json!({
        "fields": { "age": { "integerValue": "thirty" } }
    }));
    assert!(invalid.is_err());
}

#[test]
fn test_documents_url() {
    let url = documents_url("https://firestore.googleapis.com/v1", "nosql-demo-e5885").unwrap();
    assert_eq!(
        url.as_str(),
        "https://firestore.googleapis.com/v1/projects/nosql-demo-e5885/databases/(default)/documents"
    );

    let url = documents_url("http://localhost:8080/v1/", "p").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/v1/projects/p/databases/(default)/documents");

    assert!(documents_url("not a url", "p").is_err());
}

#[test]
fn test_reference_urls() {
    let client = ClientBuilder::new(Client::new()).build();
    let db = FirebaseFirestore::new_with_client(
        client,
        documents_url("https://firestore.googleapis.com/v1", "p").unwrap(),
    );

    assert!(db.collection("users").url().as_str().ends_with("/documents/users"));
    assert!(db.doc("users", "42").url().as_str().ends_with("/documents/users/42"));
    assert!(db.doc("users", "a b").url().as_str().ends_with("/documents/users/a%20b"));
}

#[tokio::test]
async fn test_get_document_relays_body() {
    let server = MockServer::start_async().await;
    let body = json!({
        "name": "projects/test-project/databases/(default)/documents/users/42",
        "fields": { "name": { "stringValue": "Ann" } },
        "createTime": "2024-01-01T00:00:00Z",
        "updateTime": "2024-01-01T00:00:00Z"
    });
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/users/42", DOCUMENTS_PATH));
            then.status(200).json_body(body.clone());
        })
        .await;

    let response = unauthenticated(&server).doc("users", "42").get().await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, body);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_relayed_not_raised() {
    let server = MockServer::start_async().await;
    let body = json!({
        "error": { "code": 404, "message": "Document not found.", "status": "NOT_FOUND" }
    });
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/users/missing", DOCUMENTS_PATH));
            then.status(404).json_body(body.clone());
        })
        .await;

    let response = unauthenticated(&server).doc("users", "missing").get().await.unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(!response.is_success());
    assert_eq!(response.body, body);
}

#[tokio::test]
async fn test_non_json_body_is_error() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/users", DOCUMENTS_PATH));
            then.status(503).body("upstream unavailable");
        })
        .await;

    let err = unauthenticated(&server).collection("users").list_documents().await.unwrap_err();
    assert!(matches!(err, FirestoreError::InvalidResponse { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn test_patch_fields() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path(format!("{}/users/42", DOCUMENTS_PATH))
                .header("content-type", "application/json")
                .json_body(json!({
                    "fields": {
                        "name": { "stringValue": "Ann" },
                        "age": { "integerValue": 30 }
                    }
                }));
            then.status(200).json_body(json!({
                "name": "projects/test-project/databases/(default)/documents/users/42",
                "fields": {
                    "name": { "stringValue": "Ann" },
                    "age": { "integerValue": "30" }
                }
            }));
        })
        .await;

    let fields = encode_fields(&object(json!({ "name": "Ann", "age": 30 })));
    let response = unauthenticated(&server)
        .doc("users", "42")
        .patch_fields(&fields)
        .await
        .unwrap();

    assert!(response.is_success());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_success_ignores_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path(format!("{}/users/42", DOCUMENTS_PATH));
            then.status(200);
        })
        .await;

    let response = unauthenticated(&server).doc("users", "42").delete().await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, serde_json::Value::Null);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(200).json_body(json!({ "access_token": "ya29.store" }));
        })
        .await;
    let list_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("{}/users", DOCUMENTS_PATH))
                .header("authorization", "Bearer ya29.store");
            then.status(200).json_body(json!({ "documents": [] }));
        })
        .await;

    let provider = Arc::new(
        TokenProvider::builder(CredentialSource::Json(service_account_json()))
            .with_token_uri(server.url("/token"))
            .build(),
    );
    let db = FirebaseFirestore::new_with_url(provider, &server.url("/v1"), "test-project").unwrap();

    db.collection("users").list_documents().await.unwrap();
    db.collection("users").list_documents().await.unwrap();

    token_mock.assert_calls_async(1).await;
    list_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn test_token_failure_surfaces_as_token_error() {
    let server = MockServer::start_async().await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/users", DOCUMENTS_PATH));
            then.status(200).json_body(json!({ "documents": [] }));
        })
        .await;

    let provider = Arc::new(
        TokenProvider::builder(CredentialSource::Env(
            "FIRESTORE_PROXY_TEST_STORE_CREDENTIALS_UNSET".to_string(),
        ))
        .with_token_uri(server.url("/token"))
        .build(),
    );
    let db = FirebaseFirestore::new_with_url(provider, &server.url("/v1"), "test-project").unwrap();

    let err = db.collection("users").list_documents().await.unwrap_err();
    match err {
        FirestoreError::Token(token_err) => assert!(token_err.is_configuration()),
        other => panic!("unexpected error: {other:?}"),
    }
    store_mock.assert_calls_async(0).await;
}
