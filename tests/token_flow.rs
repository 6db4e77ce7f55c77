mod common;

use std::time::Duration;

use celonis_mcp::auth::acquire_token;
use celonis_mcp::config::AuthMode;
use celonis_mcp::error::{AuthError, McpError};
use celonis_mcp::orchestrator::{run_with_client, Request};
use common::{test_config, MockBehavior, MockMcpServer};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth() -> AuthMode {
    AuthMode::OAuth {
        client_id: "my-id".to_string(),
        client_secret: "my-secret".to_string(),
    }
}

#[tokio::test]
async fn client_credentials_token_is_used_on_the_stream() {
    let token_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-id"))
        .and(body_string_contains("client_secret=my-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "Bearer",
            "scope": "mcp-asset.tools:execute",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&token_server)
        .await;

    let mcp = MockMcpServer::start(MockBehavior::default().echo_result(json!({"tools": []}))).await;
    let mut config = test_config(mcp.sse_url());
    config.auth = oauth();
    config.token_url = Url::parse(&format!("{}/oauth2/token", token_server.uri())).unwrap();

    let result = run_with_client(reqwest::Client::new(), &config, Request::ListTools)
        .await
        .unwrap();

    assert_eq!(result, json!({"tools": []}));
    let headers = mcp.auth_headers.lock().clone();
    assert!(!headers.is_empty());
    assert!(headers.iter().all(|h| h == "Bearer tok-123"));
}

#[tokio::test]
async fn bad_credentials_stop_before_the_stream_is_opened() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(Url::parse(&format!("{}/mcp?draft=false", server.uri())).unwrap());
    config.auth = oauth();
    config.token_url = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();

    let err = run_with_client(reqwest::Client::new(), &config, Request::ListTools)
        .await
        .unwrap_err();

    match &err {
        McpError::Auth(AuthError::BadCredentials { body }) => assert_eq!(body, "invalid_client"),
        other => panic!("expected bad credentials, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn forbidden_token_request_is_insufficient_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(403).set_body_string("scope not allowed"))
        .mount(&server)
        .await;

    let token_url = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let err = acquire_token(
        &reqwest::Client::new(),
        &token_url,
        "my-id",
        "my-secret",
        "mcp-asset.tools:execute",
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    match err {
        McpError::Auth(AuthError::InsufficientScope { scope, .. }) => {
            assert_eq!(scope, "mcp-asset.tools:execute")
        }
        other => panic!("expected insufficient scope, got {:?}", other),
    }
}

#[tokio::test]
async fn token_response_without_access_token_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&server)
        .await;

    let token_url = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let err = acquire_token(
        &reqwest::Client::new(),
        &token_url,
        "my-id",
        "my-secret",
        "mcp-asset.tools:execute",
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, McpError::Auth(AuthError::MalformedResponse)));
}

#[tokio::test]
async fn granted_token_records_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-xyz",
            "scope": "mcp-asset.tools:execute",
            "expires_in": 600
        })))
        .mount(&server)
        .await;

    let token_url = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let token = acquire_token(
        &reqwest::Client::new(),
        &token_url,
        "my-id",
        "my-secret",
        "mcp-asset.tools:execute",
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(token.bearer(), "Bearer tok-xyz");
    assert_eq!(token.scope.as_deref(), Some("mcp-asset.tools:execute"));
    assert!(token.expires_at.is_some());
}

#[tokio::test]
async fn unauthorized_stream_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let config = test_config(Url::parse(&format!("{}/mcp?draft=false", server.uri())).unwrap());
    let err = run_with_client(reqwest::Client::new(), &config, Request::ListTools)
        .await
        .unwrap_err();

    assert!(matches!(err, McpError::Auth(AuthError::BadCredentials { .. })), "{:?}", err);
}
