//! PostgreSQL 딜러 저장소.
//!
//! 딜러 한 명이 `dealers` 한 행이며 Refresh Token은 `{token, createdAt}` JSONB 배열로 내장됩니다.
//! 토큰 배열 변경은 `SELECT ... FOR UPDATE` 트랜잭션 안에서 read-modify-write 합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealer_core::{
    normalize_email, Clock, Dealer, DealerRole, NewDealer, RefreshTokenPolicy, RefreshTokenRecord,
    RefreshTokenSet,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{DealerStore, StoreError, StoreResult};

/// 고유 제약 위반 (unique_violation)
const UNIQUE_VIOLATION: &str = "23505";

const DEALER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, last_login, \
     refresh_tokens, created_at, updated_at";

/// DB에서 조회한 딜러 행.
#[derive(Debug, sqlx::FromRow)]
struct DealerRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    refresh_tokens: Json<RefreshTokenSet>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DealerRow> for Dealer {
    type Error = StoreError;

    fn try_from(row: DealerRow) -> Result<Self, Self::Error> {
        let role = DealerRole::parse(&row.role)
            .ok_or_else(|| StoreError::Serialization(format!("알 수 없는 역할: {}", row.role)))?;

        Ok(Dealer {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            is_active: row.is_active,
            last_login: row.last_login,
            refresh_tokens: row.refresh_tokens.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::DuplicateEmail
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Serialization(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgDealerStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    policy: RefreshTokenPolicy,
}

impl PgDealerStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, policy: RefreshTokenPolicy) -> Self {
        Self {
            pool,
            clock,
            policy,
        }
    }

    /// 연결 풀을 생성합니다.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> StoreResult<PgPool> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await?;

        info!("Database connection established");
        Ok(pool)
    }

    /// 스키마 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one(&self, sql: &str, id: Uuid) -> StoreResult<Dealer> {
        let row: Option<DealerRow> = sqlx::query_as(sql).bind(id).fetch_optional(&self.pool).await?;
        row.ok_or(StoreError::NotFound(id))?.try_into()
    }

    /// 토큰 배열을 행 잠금 안에서 변경합니다.
    async fn modify_tokens<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut RefreshTokenSet, DateTime<Utc>, &RefreshTokenPolicy) -> R,
    ) -> StoreResult<R> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let current: Option<(Json<RefreshTokenSet>,)> =
            sqlx::query_as("SELECT refresh_tokens FROM dealers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (Json(mut set),) = current.ok_or(StoreError::NotFound(id))?;

        let before = set.clone();
        let result = f(&mut set, now, &self.policy);

        if set != before {
            sqlx::query("UPDATE dealers SET refresh_tokens = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(Json(&set))
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(result)
    }
}

#[async_trait]
impl DealerStore for PgDealerStore {
    async fn create(&self, new: NewDealer) -> StoreResult<Dealer> {
        let dealer = Dealer::new(new, self.clock.now());

        sqlx::query(
            r#"
            INSERT INTO dealers
                (id, email, password_hash, name, role, is_active, refresh_tokens, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(dealer.id)
        .bind(&dealer.email)
        .bind(&dealer.password_hash)
        .bind(&dealer.name)
        .bind(dealer.role.as_str())
        .bind(dealer.is_active)
        .bind(Json(&dealer.refresh_tokens))
        .bind(dealer.created_at)
        .bind(dealer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(dealer)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Dealer>> {
        let sql = format!("SELECT {DEALER_COLUMNS} FROM dealers WHERE id = $1");
        let row: Option<DealerRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Dealer::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Dealer>> {
        let sql = format!("SELECT {DEALER_COLUMNS} FROM dealers WHERE lower(email) = $1");
        let row: Option<DealerRow> = sqlx::query_as(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Dealer::try_from).transpose()
    }

    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<Dealer>> {
        let sql = format!(
            "SELECT {DEALER_COLUMNS} FROM dealers \
             WHERE refresh_tokens @> jsonb_build_array(jsonb_build_object('token', $1::text))"
        );
        let row: Option<DealerRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let now = self.clock.now();
        let dealer = row.map(Dealer::try_from).transpose()?;
        Ok(dealer.filter(|d| d.refresh_tokens.contains_live(token, now, self.policy.ttl)))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> StoreResult<Dealer> {
        let sql = format!(
            "UPDATE dealers SET name = COALESCE($2, name), email = COALESCE($3, email), \
             updated_at = $4 WHERE id = $1 RETURNING {DEALER_COLUMNS}"
        );
        let row: Option<DealerRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(name)
            .bind(email.map(|e| normalize_email(&e)))
            .bind(self.clock.now())
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound(id))?.try_into()
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE dealers SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(self.clock.now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Dealer> {
        sqlx::query("UPDATE dealers SET last_login = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(at)
            .bind(self.clock.now())
            .execute(&self.pool)
            .await?;
        self.fetch_one(&format!("SELECT {DEALER_COLUMNS} FROM dealers WHERE id = $1"), id)
            .await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Dealer> {
        sqlx::query("UPDATE dealers SET is_active = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(active)
            .bind(self.clock.now())
            .execute(&self.pool)
            .await?;
        self.fetch_one(&format!("SELECT {DEALER_COLUMNS} FROM dealers WHERE id = $1"), id)
            .await
    }

    async fn list(&self) -> StoreResult<Vec<Dealer>> {
        let sql = format!("SELECT {DEALER_COLUMNS} FROM dealers ORDER BY created_at");
        let rows: Vec<DealerRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Dealer::try_from).collect()
    }

    async fn count_admins(&self) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dealers WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
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
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
