//! 딜러 도메인 모델.
//!
//! - `Dealer` - 자격증명과 신원 정보를 가진 엔티티
//! - `DealerRole` - 역할 (admin, dealer)
//! - `RefreshTokenRecord` / `RefreshTokenSet` - 딜러에 내장된 Refresh Token 목록

mod dealer;
mod refresh_token;
mod role;

pub use dealer::{normalize_email, Dealer, DealerProfile, NewDealer};
pub use refresh_token::{
    RefreshTokenPolicy, RefreshTokenRecord, RefreshTokenSet, DEFAULT_MAX_REFRESH_TOKENS,
    DEFAULT_REFRESH_TOKEN_TTL_DAYS,
};
pub use role::DealerRole;
