//! 애플리케이션 서비스.
//!
//! - [`AuthService`]: 인증 흐름
//! - [`ensure_admin`]: 시작 시 관리자 계정 생성

mod auth;
mod seed;

pub use auth::AuthService;
pub use seed::ensure_admin;
