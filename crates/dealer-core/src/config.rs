//! 설정 관리.
//!
//! 로드 순서 (뒤가 우선):
//! 1. 내장 기본값
//! 2. 단일 환경 변수 (`JWT_SECRET`, `DATABASE_URL`, `PORT`, `ADMIN_EMAIL`, `ADMIN_PASSWORD`)
//! 3. 설정 파일 (`config/default.toml`, 없으면 무시)
//! 4. `DEALER__SECTION__KEY` 환경 변수

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

use crate::domain::RefreshTokenPolicy;
use crate::error::{CoreError, CoreResult};

/// 개발 환경 전용 JWT 비밀 키.
const INSECURE_DEV_SECRET: &str = "development-secret-key-change-in-production";

/// 설정 키로 매핑되는 단일 환경 변수.
const PLAIN_ENV_VARS: &[(&str, &str)] = &[
    ("auth.jwt_secret", "JWT_SECRET"),
    ("database.url", "DATABASE_URL"),
    ("server.port", "PORT"),
    ("seed.admin_email", "ADMIN_EMAIL"),
    ("seed.admin_password", "ADMIN_PASSWORD"),
];

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitSettings,
    pub cors: CorsConfig,
    pub seed: SeedConfig,
    pub logging: LoggingConfig,
}

/// 실행 환경.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 30,
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 서버는 메모리 저장소로 동작합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

/// 인증 설정.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT 서명 키 (운영 환경 필수)
    pub jwt_secret: Option<String>,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub max_refresh_tokens: usize,
    pub bcrypt_cost: u32,
    /// 비밀번호 변경 시 모든 Refresh Token 폐기
    pub revoke_sessions_on_password_change: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            max_refresh_tokens: 5,
            bcrypt_cost: 12,
            revoke_sessions_on_password_change: false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("max_refresh_tokens", &self.max_refresh_tokens)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field(
                "revoke_sessions_on_password_change",
                &self.revoke_sessions_on_password_change,
            )
            .finish()
    }
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_ttl_minutes)
    }

    pub fn refresh_policy(&self) -> RefreshTokenPolicy {
        RefreshTokenPolicy::new(self.refresh_token_ttl_days, self.max_refresh_tokens)
    }
}

/// 요청 한도 설정 (IP별).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이 (초)
    pub window_secs: u64,
    /// `X-Forwarded-For`/`X-Real-IP`를 믿을 리버스 프록시 주소.
    /// 비어 있으면 헤더를 무시하고 연결 주소만 사용합니다.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
            trusted_proxies: Vec::new(),
        }
    }
}

/// CORS 설정. 비어 있으면 모든 origin 허용 (개발용).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// 초기 관리자 계정 설정.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SeedConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "[REDACTED]"))
            .field("admin_name", &self.admin_name)
            .finish()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty, json, compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다. 파일이 없으면 건너뜁니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?;

        for (key, var) in PLAIN_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let builder = builder
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("DEALER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("rate_limit.trusted_proxies")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }

    /// JWT 서명 키를 결정합니다.
    ///
    /// 운영 환경에서 키가 없으면 에러, 개발 환경에서는 경고 후 고정 키를 사용합니다.
    pub fn jwt_secret(&self) -> CoreResult<SecretString> {
        match self.auth.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(SecretString::from(secret.to_string())),
            _ if self.server.is_production() => Err(CoreError::MissingSetting("auth.jwt_secret")),
            _ => {
                tracing::warn!("auth.jwt_secret is not set, using insecure development secret");
                Ok(SecretString::from(INSECURE_DEV_SECRET.to_string()))
            }
        }
    }
}
