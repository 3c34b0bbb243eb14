//! 딜러 엔티티.
//!
//! `Dealer`는 자격증명 저장소만 소유하며 외부로 직렬화되지 않습니다.
//! 응답에는 비밀번호와 토큰 목록이 제거된 [`DealerProfile`]만 사용합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DealerRole, RefreshTokenSet};

/// 이메일 정규화 (앞뒤 공백 제거 + 소문자).
///
/// 이메일 고유성은 대소문자를 구분하지 않습니다.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 자격증명과 신원 정보를 가진 딜러.
#[derive(Clone)]
pub struct Dealer {
    pub id: Uuid,
    /// 정규화된 이메일
    pub email: String,
    /// bcrypt 해시
    pub password_hash: String,
    pub name: String,
    pub role: DealerRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub refresh_tokens: RefreshTokenSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dealer {
    /// 등록 정보로 새 딜러를 생성합니다.
    pub fn new(new: NewDealer, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&new.email),
            password_hash: new.password_hash,
            name: new.name,
            role: new.role,
            is_active: true,
            last_login: None,
            refresh_tokens: RefreshTokenSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == DealerRole::Admin
    }

    /// 외부 공개용 프로필.
    pub fn profile(&self) -> DealerProfile {
        DealerProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// 해시와 토큰 문자열이 로그에 남지 않도록 직접 구현
impl std::fmt::Debug for Dealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dealer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("last_login", &self.last_login)
            .field("refresh_tokens", &self.refresh_tokens.len())
            .finish_non_exhaustive()
    }
}

/// 신규 딜러 등록 정보 (비밀번호는 이미 해싱됨).
#[derive(Debug, Clone)]
pub struct NewDealer {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: DealerRole,
}

/// 딜러 공개 프로필.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DealerProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: DealerRole,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
