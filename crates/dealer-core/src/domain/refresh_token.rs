//! Refresh Token 레코드와 딜러별 토큰 집합.
//!
//! 토큰 문자열은 불투명한 난수이며, 딜러 신원은 사용 시점에 역방향 조회로 찾습니다.
//! 집합은 오래된 순으로 정렬되며 만료된 레코드는 모든 조회에서 없는 것으로 취급합니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh Token 기본 유효 기간 (일).
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// 딜러당 동시에 유지되는 Refresh Token 기본 최대 개수.
pub const DEFAULT_MAX_REFRESH_TOKENS: usize = 5;

/// Refresh Token 보존 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTokenPolicy {
    /// 레코드 유효 기간
    pub ttl: Duration,
    /// 딜러당 최대 레코드 수
    pub max_tokens: usize,
}

impl Default for RefreshTokenPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            max_tokens: DEFAULT_MAX_REFRESH_TOKENS,
        }
    }
}

impl RefreshTokenPolicy {
    pub fn new(ttl_days: i64, max_tokens: usize) -> Self {
        Self {
            ttl: Duration::days(ttl_days),
            max_tokens: max_tokens.max(1),
        }
    }
}

/// 발급된 Refresh Token 한 건.
///
/// 저장 형식은 `{token, createdAt}` 입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    /// 불투명 토큰 문자열
    pub token: String,
    /// 발급 시각
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            created_at,
        }
    }

    /// 만료 시각.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }

    /// `now` 시점에 만료되었는지 확인.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now >= self.expires_at(ttl)
    }
}

/// 딜러에 내장된 Refresh Token 목록 (오래된 순).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshTokenSet {
    records: Vec<RefreshTokenRecord>,
}

impl RefreshTokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<RefreshTokenRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RefreshTokenRecord] {
        &self.records
    }

    /// 새 레코드를 추가합니다.
    ///
    /// 만료된 레코드를 먼저 걸러낸 뒤, 이미 최대 개수 이상이면 가장 최근 `max - 1`개만
    /// 남기고 추가합니다. 추가 후 길이는 항상 `max` 이하입니다.
    pub fn push(&mut self, record: RefreshTokenRecord, now: DateTime<Utc>, policy: &RefreshTokenPolicy) {
        self.prune_expired(now, policy.ttl);

        let max = policy.max_tokens.max(1);
        if self.records.len() >= max {
            let evict = self.records.len() - (max - 1);
            self.records.drain(..evict);
        }
        self.records.push(record);
    }

    /// 일치하는 레코드를 제거합니다. 없으면 아무것도 하지 않고 `false`.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.token != token);
        self.records.len() != before
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// 만료되지 않은 레코드 중 `token`이 있는지 확인.
    pub fn contains_live(&self, token: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.records
            .iter()
            .any(|r| r.token == token && !r.is_expired(now, ttl))
    }

    /// 만료된 레코드를 제거하고 제거된 개수를 반환합니다.
    pub fn prune_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.is_expired(now, ttl));
        before - self.records.len()
    }

    /// 제시된 토큰을 새 레코드로 교체합니다 (rotation).
    ///
    /// 제거와 추가가 한 번의 변경으로 적용됩니다. `old`가 없거나 만료되었으면
    /// 집합을 건드리지 않고 `false`를 반환합니다.
    pub fn rotate(
        &mut self,
        old: &str,
        new: RefreshTokenRecord,
        now: DateTime<Utc>,
        policy: &RefreshTokenPolicy,
    ) -> bool {
        if !self.contains_live(old, now, policy.ttl) {
            return false;
        }
        self.remove(old);
        self.push(new, now, policy);
        true
    }
}
