//! Tests for the auth module

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::BackoffType;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials::new(
        UserCredentials::new("analyst", "pw-123"),
        ClientCredentials::new("client-9", "key-456"),
    )
}

fn provider(server: &MockServer) -> TokenProvider {
    TokenProvider::new(
        HttpClient::new().unwrap(),
        AuthConfig::new(format!("{}/auth/prod/token", server.uri())),
    )
}

#[tokio::test]
async fn test_acquire_token_sends_form_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("email=analyst"))
        .and(body_string_contains("pwd=pw-123"))
        .and(body_string_contains("client_id=client-9"))
        .and(body_string_contains("secret_key=key-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-abc"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = provider(&mock_server)
        .acquire_token(&credentials())
        .await
        .unwrap();

    assert_eq!(token.expose(), "tok-abc");
}

#[tokio::test]
async fn test_non_success_status_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .acquire_token(&credentials())
        .await
        .unwrap_err();

    match err {
        Error::Auth { status, message } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "invalid credentials");
        }
        other => panic!("Expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .acquire_token(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { status: None, ref message } if message == "missing token field"));
}

#[tokio::test]
async fn test_empty_token_is_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": ""})))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .acquire_token(&credentials())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("missing token field"));
}

#[tokio::test]
async fn test_non_json_body_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .acquire_token(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { status: None, .. }));
}

#[tokio::test]
async fn test_token_request_is_never_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .max_retries(3)
            .backoff(
                BackoffType::Constant,
                Duration::from_millis(1),
                Duration::from_millis(1),
            )
            .build(),
    )
    .unwrap();
    let provider = TokenProvider::new(
        client,
        AuthConfig::new(format!("{}/auth/prod/token", mock_server.uri())),
    );

    let err = provider.acquire_token(&credentials()).await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: Some(503), .. }));
}

#[tokio::test]
async fn test_nested_token_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/prod/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "nested"}})),
        )
        .mount(&mock_server)
        .await;

    let provider = TokenProvider::new(
        HttpClient::new().unwrap(),
        AuthConfig::new(format!("{}/auth/prod/token", mock_server.uri()))
            .with_token_path("$.data.token"),
    );

    let token = provider.acquire_token(&credentials()).await.unwrap();
    assert_eq!(token.expose(), "nested");
}

#[test]
fn test_extract_jsonpath() {
    let value = json!({"token": "abc", "data": {"token": "def", "n": 5}});
    assert_eq!(extract_jsonpath(&value, "token"), Some("abc".to_string()));
    assert_eq!(extract_jsonpath(&value, "$.data.token"), Some("def".to_string()));
    assert_eq!(extract_jsonpath(&value, "data.n"), None);
    assert_eq!(extract_jsonpath(&value, "missing"), None);
}
