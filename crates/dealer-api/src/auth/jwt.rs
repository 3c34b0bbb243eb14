//! JWT Access Token 처리.
//!
//! Access Token은 `{sub, email, role}`을 담은 HS256 서명 토큰이며 DB 조회 없이 검증됩니다.
//! 만료는 jsonwebtoken의 시스템 시계 대신 주입된 [`Clock`] 기준으로 판정합니다 (leeway 0).

use chrono::{DateTime, Duration, Utc};
use dealer_core::{Clock, DealerProfile, DealerRole};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - 딜러 ID
    pub sub: String,
    pub email: String,
    pub role: DealerRole,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl AccessClaims {
    pub fn new(dealer: &DealerProfile, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: dealer.id.to_string(),
            email: dealer.email.clone(),
            role: dealer.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// `now` 시점에 만료되었는지 확인.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn dealer_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// JWT 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("유효하지 않은 토큰")]
    InvalidToken,
}

/// 서명/검증 키 쌍.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    pub fn encode(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(JwtError::from)
    }

    /// 서명을 검증하고 `clock` 기준으로 만료를 판정합니다.
    pub fn decode(&self, token: &str, clock: &dyn Clock) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|_| JwtError::InvalidToken)?
            .claims;

        if claims.is_expired_at(clock.now()) {
            return Err(JwtError::TokenExpired);
        }
        Ok(claims)
    }
}
