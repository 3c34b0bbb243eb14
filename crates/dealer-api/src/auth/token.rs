//! 토큰 서비스.
//!
//! 단기 Access Token(JWT)과 장기 불투명 Refresh Token을 발급하고,
//! 저장소를 통해 Refresh Token 집합을 추가/폐기/교체합니다.

use chrono::Duration;
use dealer_core::{Clock, Dealer, DealerProfile, RefreshTokenRecord};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

use super::jwt::{AccessClaims, JwtError, JwtKeys};
use crate::store::{DealerStore, StoreError};

/// Refresh Token 난수 바이트 수 (hex 인코딩 시 80자).
pub const REFRESH_TOKEN_BYTES: usize = 40;

/// 토큰 작업 에러.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access Token + Refresh Token 쌍.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access Token 만료까지 남은 시간 (초)
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    store: Arc<dyn DealerStore>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: &SecretString,
        store: Arc<dyn DealerStore>,
        clock: Arc<dyn Clock>,
        access_ttl: Duration,
    ) -> Self {
        Self {
            keys: JwtKeys::new(secret),
            store,
            clock,
            access_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// `{id, email, role}`을 담은 Access Token을 발급합니다.
    pub fn issue_access_token(&self, dealer: &DealerProfile) -> Result<String, JwtError> {
        let claims = AccessClaims::new(dealer, self.clock.now(), self.access_ttl);
        self.keys.encode(&claims)
    }

    /// 딜러 신원과 무관한 난수 Refresh Token을 생성합니다.
    pub fn issue_refresh_token(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.keys.decode(token, self.clock.as_ref())
    }

    /// 새 Refresh Token을 만들어 딜러에게 추가하고 반환합니다.
    pub async fn add_refresh_token(&self, dealer_id: Uuid) -> Result<String, StoreError> {
        let token = self.issue_refresh_token();
        let record = RefreshTokenRecord::new(token.clone(), self.clock.now());
        self.store.add_refresh_token(dealer_id, record).await?;
        Ok(token)
    }

    /// 일치하는 토큰을 폐기합니다. 없어도 에러가 아닙니다.
    pub async fn remove_refresh_token(&self, dealer_id: Uuid, token: &str) -> Result<bool, StoreError> {
        self.store.remove_refresh_token(dealer_id, token).await
    }

    pub async fn remove_all_refresh_tokens(&self, dealer_id: Uuid) -> Result<(), StoreError> {
        self.store.remove_all_refresh_tokens(dealer_id).await
    }

    /// 제시된 토큰을 새 토큰으로 교체합니다.
    ///
    /// 제시된 토큰이 이미 사용되었거나 만료되었으면 `None`.
    pub async fn rotate_refresh_token(
        &self,
        dealer_id: Uuid,
        presented: &str,
    ) -> Result<Option<String>, StoreError> {
        let token = self.issue_refresh_token();
        let record = RefreshTokenRecord::new(token.clone(), self.clock.now());
        let rotated = self
            .store
            .rotate_refresh_token(dealer_id, presented, record)
            .await?;
        Ok(rotated.then_some(token))
    }

    /// 새 Access Token과 Refresh Token을 발급하고 Refresh Token을 저장합니다.
    pub async fn issue_pair(&self, dealer: &Dealer) -> Result<TokenPair, TokenError> {
        let access_token = self.issue_access_token(&dealer.profile())?;
        let refresh_token = self.add_refresh_token(dealer.id).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.num_seconds(),
        })
    }
}
