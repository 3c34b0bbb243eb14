//! 통합 API 에러 타입.
//!
//! 모든 실패는 같은 형식의 본문으로 응답합니다:
//!
//! ```json
//! {
//!   "error": "Access denied",
//!   "message": "Token expired",
//!   "code": "TOKEN_EXPIRED"
//! }
//! ```
//!
//! 내부 에러는 로그에만 상세 내용을 남기고 호출자에게는 일반 메시지만 반환합니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dealer_core::{ErrorBody, ErrorCode};
use validator::ValidationErrors;

use crate::auth::{JwtError, PasswordError, TokenError};
use crate::store::StoreError;

/// API 에러.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No token provided")]
    NoToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Admin access required")]
    Forbidden,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("Current password is incorrect")]
    InvalidCurrentPassword,
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoToken
            | ApiError::InvalidToken
            | ApiError::TokenExpired
            | ApiError::AccountInactive
            | ApiError::InvalidCredentials
            | ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_)
            | ApiError::DuplicateEmail
            | ApiError::InvalidCurrentPassword => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::NoToken => ErrorCode::NoToken,
            ApiError::InvalidToken => ErrorCode::InvalidToken,
            ApiError::TokenExpired => ErrorCode::TokenExpired,
            ApiError::AccountInactive => ErrorCode::AccountInactive,
            ApiError::Forbidden => ErrorCode::Forbidden,
            ApiError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ApiError::InvalidRefreshToken => ErrorCode::InvalidRefreshToken,
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::DuplicateEmail => ErrorCode::DuplicateEmail,
            ApiError::InvalidCurrentPassword => ErrorCode::InvalidCurrentPassword,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 에러 분류 문구 (`error` 필드).
    fn title(&self) -> &'static str {
        match self {
            ApiError::NoToken
            | ApiError::InvalidToken
            | ApiError::TokenExpired
            | ApiError::AccountInactive
            | ApiError::Forbidden => "Access denied",
            ApiError::InvalidCredentials => "Login failed",
            ApiError::InvalidRefreshToken => "Refresh failed",
            ApiError::Validation(_) => "Validation Error",
            ApiError::DuplicateEmail => "Conflict",
            ApiError::InvalidCurrentPassword => "Password change failed",
            ApiError::NotFound(_) => "Not found",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.title(), self.to_string()).with_code(self.code());
        match self {
            ApiError::Validation(messages) => {
                body.with_details(serde_json::json!({ "messages": messages }))
            }
            _ => body,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::NotFound(id) => ApiError::NotFound(format!("Dealer {} not found", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => ApiError::TokenExpired,
            JwtError::InvalidToken => ApiError::InvalidToken,
            JwtError::Encoding(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Jwt(e) => e.into(),
            TokenError::Store(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{}: invalid value", field))
                })
            })
            .collect();
        messages.sort();
        ApiError::Validation(messages)
    }
}
