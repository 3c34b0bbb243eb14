//! Axum용 인증 추출기.
//!
//! 요청 하나에 대한 판정 순서:
//! 1. Authorization 헤더에서 Bearer 토큰 추출 (없으면 `NO_TOKEN`)
//! 2. 서명/만료 검증 (`INVALID_TOKEN` / `TOKEN_EXPIRED`)
//! 3. 딜러 조회 (없으면 `INVALID_TOKEN`)
//! 4. 비활성 계정 거부 (`ACCOUNT_INACTIVE`)
//! 5. 비밀번호가 제거된 프로필을 핸들러에 전달

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use dealer_core::{DealerProfile, DealerRole};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// 인증된 딜러 추출기.
///
/// ```rust,ignore
/// async fn protected_handler(AuthDealer(dealer): AuthDealer) -> impl IntoResponse {
///     format!("Hello, {}!", dealer.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthDealer(pub DealerProfile);

/// 관리자 권한을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct AdminDealer(pub DealerProfile);

/// Authorization 헤더에서 Bearer 토큰을 꺼냅니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::NoToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?
        .trim();

    if value.is_empty() || value == "Bearer" {
        return Err(ApiError::NoToken);
    }

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidToken)?
        .trim();

    if token.is_empty() {
        return Err(ApiError::NoToken);
    }
    Ok(token)
}

/// 역할 확인.
pub fn require_role(required: DealerRole, dealer: &DealerProfile) -> Result<(), ApiError> {
    if dealer.role.at_least(required) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

impl FromRequestParts<Arc<AppState>> for AuthDealer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let dealer = state.auth.authenticate(token).await?;
        Ok(AuthDealer(dealer))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminDealer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthDealer(dealer) = AuthDealer::from_request_parts(parts, state).await?;
        if let Err(e) = require_role(DealerRole::Admin, &dealer) {
            tracing::warn!(dealer_id = %dealer.id, code = %e.code(), "Admin access denied");
            return Err(e);
        }
        Ok(AdminDealer(dealer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert!(matches!(bearer_token(&headers(None)), Err(ApiError::NoToken)));
        assert!(matches!(bearer_token(&headers(Some(""))), Err(ApiError::NoToken)));
        assert!(matches!(bearer_token(&headers(Some("Bearer "))), Err(ApiError::NoToken)));
        assert!(matches!(
            bearer_token(&headers(Some("Basic dXNlcjpwYXNz"))),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn test_require_role() {
        let now = chrono::Utc::now();
        let mut dealer = DealerProfile {
            id: uuid::Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "Alice".to_string(),
            role: DealerRole::Dealer,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        assert!(require_role(DealerRole::Dealer, &dealer).is_ok());
        assert!(matches!(
            require_role(DealerRole::Admin, &dealer),
            Err(ApiError::Forbidden)
        ));

        dealer.role = DealerRole::Admin;
        assert!(require_role(DealerRole::Admin, &dealer).is_ok());
    }
}
