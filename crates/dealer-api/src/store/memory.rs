//! 메모리 기반 딜러 저장소.
//!
//! 각 변경은 하나의 쓰기 잠금 안에서 끝납니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealer_core::{
    normalize_email, Clock, Dealer, DealerRole, NewDealer, RefreshTokenPolicy, RefreshTokenRecord,
    RefreshTokenSet,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DealerStore, StoreError, StoreResult};

pub struct InMemoryDealerStore {
    dealers: RwLock<HashMap<Uuid, Dealer>>,
    clock: Arc<dyn Clock>,
    policy: RefreshTokenPolicy,
}

impl InMemoryDealerStore {
    pub fn new(clock: Arc<dyn Clock>, policy: RefreshTokenPolicy) -> Self {
        Self {
            dealers: RwLock::new(HashMap::new()),
            clock,
            policy,
        }
    }

    fn email_taken(dealers: &HashMap<Uuid, Dealer>, email: &str, except: Option<Uuid>) -> bool {
        dealers
            .values()
            .any(|d| d.email == email && Some(d.id) != except)
    }

    /// 딜러 한 명을 잠금 안에서 변경합니다.
    async fn modify<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Dealer, DateTime<Utc>) -> R,
    ) -> StoreResult<R> {
        let now = self.clock.now();
        let mut dealers = self.dealers.write().await;
        let dealer = dealers.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(f(dealer, now))
    }

    async fn modify_tokens<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut RefreshTokenSet, DateTime<Utc>, &RefreshTokenPolicy) -> R,
    ) -> StoreResult<R> {
        let policy = self.policy;
        self.modify(id, |dealer, now| {
            let result = f(&mut dealer.refresh_tokens, now, &policy);
            dealer.updated_at = now;
            result
        })
        .await
    }
}

#[async_trait]
impl DealerStore for InMemoryDealerStore {
    async fn create(&self, new: NewDealer) -> StoreResult<Dealer> {
        let dealer = Dealer::new(new, self.clock.now());
        let mut dealers = self.dealers.write().await;
        if Self::email_taken(&dealers, &dealer.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        dealers.insert(dealer.id, dealer.clone());
        Ok(dealer)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Dealer>> {
        Ok(self.dealers.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Dealer>> {
        let email = normalize_email(email);
        Ok(self
            .dealers
            .read()
            .await
            .values()
            .find(|d| d.email == email)
            .cloned())
    }

    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<Dealer>> {
        let now = self.clock.now();
        Ok(self
            .dealers
            .read()
            .await
            .values()
            .find(|d| d.refresh_tokens.contains_live(token, now, self.policy.ttl))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> StoreResult<Dealer> {
        let now = self.clock.now();
        let mut dealers = self.dealers.write().await;

        let email = email.map(|e| normalize_email(&e));
        if let Some(email) = email.as_deref() {
            if Self::email_taken(&dealers, email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let dealer = dealers.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(name) = name {
            dealer.name = name;
        }
        if let Some(email) = email {
            dealer.email = email;
        }
        dealer.updated_at = now;
        Ok(dealer.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<()> {
        self.modify(id, |dealer, now| {
            dealer.password_hash = password_hash;
            dealer.updated_at = now;
        })
        .await
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Dealer> {
        self.modify(id, |dealer, now| {
            dealer.last_login = Some(at);
            dealer.updated_at = now;
            dealer.clone()
        })
        .await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Dealer> {
        self.modify(id, |dealer, now| {
            dealer.is_active = active;
            dealer.updated_at = now;
            dealer.clone()
        })
        .await
    }

    async fn list(&self) -> StoreResult<Vec<Dealer>> {
        let mut dealers: Vec<Dealer> = self.dealers.read().await.values().cloned().collect();
        dealers.sort_by_key(|d| d.created_at);
        Ok(dealers)
    }

    async fn count_admins(&self) -> StoreResult<u64> {
        Ok(self
            .dealers
            .read()
            .await
            .values()
            .filter(|d| d.role == DealerRole::Admin)
            .count() as u64)
    }

    async fn add_refresh_token(&self, id: Uuid, record: RefreshTokenRecord) -> StoreResult<()> {
        self.modify_tokens(id, |set, now, policy| set.push(record, now, policy))
            .await
    }

    async fn remove_refresh_token(&self, id: Uuid, token: &str) -> StoreResult<bool> {
        self.modify_tokens(id, |set, _, _| set.remove(token)).await
    }

    async fn remove_all_refresh_tokens(&self, id: Uuid) -> StoreResult<()> {
        self.modify_tokens(id, |set, _, _| set.clear()).await
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old: &str,
        new: RefreshTokenRecord,
    ) -> StoreResult<bool> {
        self.modify_tokens(id, |set, now, policy| set.rotate(old, new, now, policy))
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
