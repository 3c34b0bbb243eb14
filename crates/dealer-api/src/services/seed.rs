//! 초기 관리자 계정 생성.

use dealer_core::{normalize_email, DealerRole, NewDealer, SeedConfig};
use tracing::{info, warn};

use crate::auth::PasswordHasher;
use crate::error::ApiResult;
use crate::store::DealerStore;

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// 관리자가 하나도 없을 때 설정된 관리자 계정을 만듭니다.
///
/// 이메일과 비밀번호가 모두 설정된 경우에만 동작하며, 생성했으면 `true`.
/// 비밀번호가 너무 짧으면 경고만 남기고 건너뜁니다 (서버 시작은 계속).
pub async fn ensure_admin(
    store: &dyn DealerStore,
    hasher: &PasswordHasher,
    seed: &SeedConfig,
) -> ApiResult<bool> {
    let (Some(email), Some(password)) = (seed.admin_email.as_deref(), seed.admin_password.as_deref())
    else {
        return Ok(false);
    };

    if store.count_admins().await? > 0 {
        return Ok(false);
    }

    if password.len() < 6 {
        warn!("Seed admin password is shorter than 6 characters, skipping");
        return Ok(false);
    }

    let email = normalize_email(email);
    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "Seed admin email already belongs to a dealer, skipping");
        return Ok(false);
    }

    let name = seed
        .admin_name
        .as_deref()
        .map(str::trim)
        .filter(|n| n.len() >= 2)
        .unwrap_or(DEFAULT_ADMIN_NAME)
        .to_string();

    let dealer = store
        .create(NewDealer {
            email,
            password_hash: hasher.hash(password).await?,
            name,
            role: DealerRole::Admin,
        })
        .await?;

    info!(dealer_id = %dealer.id, email = %dealer.email, "Seed admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MIN_COST;
    use crate::store::InMemoryDealerStore;
    use dealer_core::{ManualClock, RefreshTokenPolicy};
    use std::sync::Arc;

    fn store() -> InMemoryDealerStore {
        InMemoryDealerStore::new(Arc::new(ManualClock::starting_now()), RefreshTokenPolicy::default())
    }

    fn seed(email: Option<&str>, password: Option<&str>) -> SeedConfig {
        SeedConfig {
            admin_email: email.map(String::from),
            admin_password: password.map(String::from),
            admin_name: None,
        }
    }

    #[tokio::test]
    async fn test_seed_creates_admin_once() {
        let store = store();
        let hasher = PasswordHasher::new(MIN_COST);
        let config = seed(Some("Admin@AutoUniverse.com"), Some("changeme"));

        assert!(ensure_admin(&store, &hasher, &config).await.unwrap());
        assert!(!ensure_admin(&store, &hasher, &config).await.unwrap());

        let admin = store.find_by_email("admin@autouniverse.com").await.unwrap().unwrap();
        assert_eq!(admin.role, DealerRole::Admin);
        assert_eq!(admin.name, DEFAULT_ADMIN_NAME);
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_skipped_without_credentials() {
        let store = store();
        let hasher = PasswordHasher::new(MIN_COST);

        assert!(!ensure_admin(&store, &hasher, &seed(Some("a@x.com"), None)).await.unwrap());
        assert!(!ensure_admin(&store, &hasher, &seed(None, None)).await.unwrap());
        assert_eq!(store.count_admins().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_skips_short_password() {
        let store = store();
        let hasher = PasswordHasher::new(MIN_COST);

        let created = ensure_admin(&store, &hasher, &seed(Some("admin@x.com"), Some("12345")))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(store.count_admins().await.unwrap(), 0);
        assert!(store.find_by_email("admin@x.com").await.unwrap().is_none());
    }
}
