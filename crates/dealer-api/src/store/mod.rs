//! 자격증명 저장소 (Credential Store).
//!
//! 딜러 레코드와 내장된 Refresh Token 목록을 소유합니다.
//! 모든 변경은 딜러 한 명 단위의 read-modify-write 이며, 만료된 Refresh Token은
//! 조회 시 없는 것으로 취급합니다.
//!
//! # 구현
//!
//! - [`InMemoryDealerStore`]: 단일 프로세스/테스트용
//! - [`PgDealerStore`]: PostgreSQL (JSONB 토큰 배열)

mod memory;
mod postgres;

pub use memory::InMemoryDealerStore;
pub use postgres::PgDealerStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealer_core::{Dealer, NewDealer, RefreshTokenRecord};
use uuid::Uuid;

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("이미 사용 중인 이메일입니다")]
    DuplicateEmail,
    #[error("딜러를 찾을 수 없습니다: {0}")]
    NotFound(Uuid),
    #[error("데이터베이스 에러: {0}")]
    Database(String),
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 딜러 저장소 인터페이스.
#[async_trait]
pub trait DealerStore: Send + Sync {
    /// 새 딜러를 저장합니다. 이메일이 이미 있으면 `DuplicateEmail`.
    async fn create(&self, new: NewDealer) -> StoreResult<Dealer>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Dealer>>;

    /// 대소문자를 구분하지 않고 이메일로 조회합니다.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Dealer>>;

    /// 만료되지 않은 Refresh Token을 가진 딜러를 역방향 조회합니다.
    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<Dealer>>;

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> StoreResult<Dealer>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<()>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Dealer>;

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Dealer>;

    /// 가입 순으로 전체 딜러를 반환합니다.
    async fn list(&self) -> StoreResult<Vec<Dealer>>;

    async fn count_admins(&self) -> StoreResult<u64>;

    /// 토큰을 추가합니다. 최대 개수를 넘으면 가장 오래된 것부터 제거됩니다.
    async fn add_refresh_token(&self, id: Uuid, record: RefreshTokenRecord) -> StoreResult<()>;

    /// 일치하는 토큰을 제거합니다. 없으면 `false` (에러 아님).
    async fn remove_refresh_token(&self, id: Uuid, token: &str) -> StoreResult<bool>;

    async fn remove_all_refresh_tokens(&self, id: Uuid) -> StoreResult<()>;

    /// `old`를 `new`로 한 번의 쓰기로 교체합니다.
    ///
    /// `old`가 이미 없거나 만료되었으면 아무것도 바꾸지 않고 `false`.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old: &str,
        new: RefreshTokenRecord,
    ) -> StoreResult<bool>;

    /// 저장소 연결 상태 확인.
    async fn ping(&self) -> StoreResult<()>;
}
