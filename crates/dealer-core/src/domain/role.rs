//! 딜러 역할.

use serde::{Deserialize, Serialize};

/// 딜러 역할.
///
/// `admin`만 관리자 전용 라우트에 접근할 수 있습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DealerRole {
    /// 관리자
    Admin,
    /// 일반 딜러 직원
    #[default]
    Dealer,
}

impl DealerRole {
    /// 역할의 우선순위 레벨 (높을수록 더 많은 권한).
    pub fn level(&self) -> u8 {
        match self {
            DealerRole::Admin => 100,
            DealerRole::Dealer => 10,
        }
    }

    /// 특정 역할 이상인지 확인.
    pub fn at_least(&self, required: DealerRole) -> bool {
        self.level() >= required.level()
    }

    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(DealerRole::Admin),
            "dealer" => Some(DealerRole::Dealer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealerRole::Admin => "admin",
            DealerRole::Dealer => "dealer",
        }
    }
}

impl std::fmt::Display for DealerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_level() {
        assert!(DealerRole::Admin.level() > DealerRole::Dealer.level());
        assert!(DealerRole::Admin.at_least(DealerRole::Dealer));
        assert!(!DealerRole::Dealer.at_least(DealerRole::Admin));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(DealerRole::parse("admin"), Some(DealerRole::Admin));
        assert_eq!(DealerRole::parse(" DEALER "), Some(DealerRole::Dealer));
        assert_eq!(DealerRole::parse("viewer"), None);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&DealerRole::Admin).unwrap(), "\"admin\"");
        let parsed: DealerRole = serde_json::from_str("\"dealer\"").unwrap();
        assert_eq!(parsed, DealerRole::Dealer);
        assert_eq!(DealerRole::default(), DealerRole::Dealer);
    }
}
