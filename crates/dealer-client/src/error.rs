//! 클라이언트 세션 에러 타입.

use dealer_core::{ErrorBody, ErrorCode};
use thiserror::Error;

/// 세션 관련 에러.
#[derive(Debug, Error)]
pub enum SessionError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 서버가 에러 본문으로 응답
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },

    /// Refresh Token이 거부되어 로컬 세션을 비움
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// 저장된 토큰이 없음
    #[error("Not authenticated")]
    NotAuthenticated,

    /// 토큰 저장소 읽기/쓰기 실패
    #[error("Token storage error: {0}")]
    Storage(String),

    /// 응답 본문 해석 실패
    #[error("Decode error: {0}")]
    Decode(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// 서버 에러 본문으로부터 생성.
    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        SessionError::Api {
            status,
            code: body.code,
            message: body.message,
        }
    }

    /// 서버가 내려준 에러 코드.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            SessionError::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// 다시 로그인해야 하는 에러인지 확인.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            SessionError::SessionExpired | SessionError::NotAuthenticated
        ) || matches!(
            self.code(),
            Some(ErrorCode::InvalidToken | ErrorCode::AccountInactive | ErrorCode::InvalidRefreshToken)
        )
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_login() {
        assert!(SessionError::SessionExpired.requires_login());
        assert!(SessionError::Api {
            status: 401,
            code: Some(ErrorCode::AccountInactive),
            message: "Account is inactive".into(),
        }
        .requires_login());
        assert!(!SessionError::Api {
            status: 401,
            code: Some(ErrorCode::TokenExpired),
            message: "Token expired".into(),
        }
        .requires_login());
        assert!(!SessionError::Network("refused".into()).requires_login());
    }

    #[test]
    fn test_from_body() {
        let body = ErrorBody::new("Access denied", "Token expired").with_code(ErrorCode::TokenExpired);
        let err = SessionError::from_body(401, body);
        assert_eq!(err.code(), Some(ErrorCode::TokenExpired));
        assert_eq!(err.to_string(), "API error 401: Token expired");
    }
}
