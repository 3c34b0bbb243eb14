//! reqwest 전송 계층 및 세션 관리자 통합 테스트
//!
//! mockito 서버를 상대로 실제 HTTP 요청을 보냅니다.

use std::sync::Arc;

use dealer_client::{
    ApiRequest, HttpTransport, MemoryTokenStorage, Method, SessionConfig, SessionError,
    SessionManager, StoredTokens, TokenStorage, Transport,
};
use dealer_core::ErrorCode;
use mockito::Matcher;
use serde_json::json;

const DEALER: &str = r#"{
    "id": "5f0c5f8e-0000-4000-8000-000000000001",
    "email": "a@x.com",
    "name": "Alice",
    "role": "dealer",
    "isActive": true,
    "createdAt": "2024-01-01T00:00:00Z",
    "updatedAt": "2024-01-01T00:00:00Z"
}"#;

fn auth_body(access: &str, refresh: &str) -> String {
    format!(
        r#"{{"accessToken":"{access}","refreshToken":"{refresh}","expiresIn":900,"tokenType":"Bearer","dealer":{DEALER}}}"#
    )
}

fn no_timer() -> SessionConfig {
    SessionConfig {
        auto_refresh: false,
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_transport_sends_bearer_and_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/auth/profile")
        .match_header("authorization", "Bearer token-1")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "name": "Alice B" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Profile updated successfully"}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = HttpTransport::with_default_timeout(server.url()).unwrap();
    let response = transport
        .send(
            ApiRequest::new(Method::PUT, "/api/auth/profile")
                .with_body(json!({ "name": "Alice B" }))
                .with_bearer(Some("token-1".to_string())),
        )
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.body["message"], "Profile updated successfully");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_returns_error_bodies() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/auth/verify")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Access denied","message":"Token expired","code":"TOKEN_EXPIRED"}"#)
        .create_async()
        .await;

    let transport = HttpTransport::with_default_timeout(server.url()).unwrap();
    let response = transport
        .send(ApiRequest::get("/api/auth/verify"))
        .await
        .unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(response.error_code(), Some(ErrorCode::TokenExpired));
}

#[tokio::test]
async fn test_transport_connection_failure() {
    let transport = HttpTransport::with_default_timeout("http://127.0.0.1:1").unwrap();
    let err = transport
        .send(ApiRequest::get("/api/health"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
}

#[tokio::test]
async fn test_session_refreshes_over_http() {
    let mut server = mockito::Server::new_async().await;

    let expired = server
        .mock("GET", "/api/auth/profile")
        .match_header("authorization", "Bearer old-access")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Access denied","message":"Token expired","code":"TOKEN_EXPIRED"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh")
        .match_body(Matcher::Json(json!({ "refreshToken": "old-refresh" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_body("new-access", "new-refresh"))
        .expect(1)
        .create_async()
        .await;
    let profile = server
        .mock("GET", "/api/auth/profile")
        .match_header("authorization", "Bearer new-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"dealer":{DEALER}}}"#))
        .expect(1)
        .create_async()
        .await;

    let storage = Arc::new(MemoryTokenStorage::with_tokens(StoredTokens::new(
        "old-access",
        "old-refresh",
    )));
    let transport = Arc::new(HttpTransport::with_default_timeout(server.url()).unwrap());
    let session = SessionManager::new(transport, storage.clone(), no_timer())
        .await
        .unwrap();

    let response = session
        .call(Method::GET, "/api/auth/profile", None)
        .await
        .unwrap();
    assert_eq!(response.body["dealer"]["name"], "Alice");
    assert_eq!(
        storage.load().await.unwrap(),
        Some(StoredTokens::new("new-access", "new-refresh"))
    );

    expired.assert_async().await;
    refresh.assert_async().await;
    profile.assert_async().await;
}

#[tokio::test]
async fn test_session_expires_when_refresh_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _expired = server
        .mock("GET", "/api/cars")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Access denied","message":"Token expired","code":"TOKEN_EXPIRED"}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":"Refresh failed","message":"Invalid or expired refresh token","code":"INVALID_REFRESH_TOKEN"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let storage = Arc::new(MemoryTokenStorage::with_tokens(StoredTokens::new(
        "old-access",
        "old-refresh",
    )));
    let transport = Arc::new(HttpTransport::with_default_timeout(server.url()).unwrap());
    let session = SessionManager::new(transport, storage.clone(), no_timer())
        .await
        .unwrap();

    let err = session.call(Method::GET, "/api/cars", None).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert!(!session.is_authenticated());
    assert!(storage.load().await.unwrap().is_none());
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_login_over_http() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("POST", "/api/auth/login")
        .match_body(Matcher::Json(json!({ "email": "a@x.com", "password": "secret1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_body("access-1", "refresh-1"))
        .expect(1)
        .create_async()
        .await;

    let storage = Arc::new(MemoryTokenStorage::new());
    let transport = Arc::new(HttpTransport::with_default_timeout(server.url()).unwrap());
    let session = SessionManager::new(transport, storage.clone(), no_timer())
        .await
        .unwrap();

    let dealer = session.login("a@x.com", "secret1").await.unwrap();
    assert_eq!(dealer.name, "Alice");
    assert!(session.is_authenticated());
    assert_eq!(
        storage.load().await.unwrap(),
        Some(StoredTokens::new("access-1", "refresh-1"))
    );
    login.assert_async().await;
}
