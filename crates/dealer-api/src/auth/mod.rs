//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`AccessClaims`]: JWT 페이로드
//! - [`TokenService`]: Access/Refresh Token 발급, 교체, 폐기
//! - [`AuthDealer`] / [`AdminDealer`]: Axum 핸들러용 인증 추출기
//! - [`PasswordHasher`]: bcrypt 해싱

mod jwt;
mod middleware;
mod password;
mod token;

pub use jwt::{AccessClaims, JwtError, JwtKeys};
pub use middleware::{bearer_token, require_role, AdminDealer, AuthDealer};
pub use password::{
    hash_password, verify_password, PasswordError, PasswordHasher, MAX_COST, MIN_COST,
};
pub use token::{TokenError, TokenPair, TokenService, REFRESH_TOKEN_BYTES};
