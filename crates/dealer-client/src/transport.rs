//! HTTP 전송 계층.
//!
//! 세션 관리자는 [`Transport`]만 알고 있어서 테스트에서는 가짜 서버로 교체할 수 있습니다.

use async_trait::async_trait;
use dealer_core::{ErrorBody, ErrorCode};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// 기본 요청 타임아웃.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API 요청.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// `/api/...` 형태의 경로
    pub path: String,
    pub body: Option<Value>,
    /// Access Token (있으면 `Authorization: Bearer` 헤더로 전송)
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// API 응답.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON이 아닌 본문은 문자열, 빈 본문은 `Null`
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_body(&self) -> Option<ErrorBody> {
        if self.is_success() {
            return None;
        }
        serde_json::from_value(self.body.clone()).ok()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_body().and_then(|body| body.code)
    }

    /// 실패 응답을 에러로 변환합니다.
    pub fn into_error(self) -> SessionError {
        match self.error_body() {
            Some(body) => SessionError::from_body(self.status, body),
            None => SessionError::Api {
                status: self.status,
                code: None,
                message: match self.body {
                    Value::String(text) => text,
                    other => other.to_string(),
                },
            },
        }
    }

    /// 성공 응답은 그대로, 실패 응답은 에러로.
    pub fn ensure_success(self) -> SessionResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> SessionResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// 요청 전송 trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// 상태 코드와 무관하게 응답을 반환합니다. 연결 실패만 에러입니다.
    async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse>;
}

/// reqwest 기반 전송 계층.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// 새 전송 계층 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `SessionError::Network`를 반환합니다.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SessionResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn with_default_timeout(base_url: impl Into<String>) -> SessionResult<Self> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "Sending API request");

        let mut builder = self.client.request(request.method, &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse::new(status, body))
    }
}
