//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 Axum의 State extractor로 핸들러와 인증 추출기에 주입됩니다.

use dealer_core::{AppConfig, Clock, CoreError};
use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::services::AuthService;
use crate::store::DealerStore;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 로드된 설정
    pub config: Arc<AppConfig>,

    /// 자격증명 저장소 (PostgreSQL 또는 메모리)
    pub store: Arc<dyn DealerStore>,

    /// 토큰 만료 판정에 쓰는 시계
    pub clock: Arc<dyn Clock>,

    /// 인증 흐름 (등록, 로그인, 갱신, 로그아웃 ...)
    pub auth: AuthService,

    /// 데이터베이스 연결 풀 (PostgreSQL 저장소 사용 시)
    pub db_pool: Option<sqlx::PgPool>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정에서 인증 서비스(토큰 서비스 포함)를 구성합니다.
    ///
    /// 운영 환경에서 JWT 비밀 키가 없으면 실패합니다.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DealerStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        let secret = config.jwt_secret()?;

        let tokens = TokenService::new(
            &secret,
            store.clone(),
            clock.clone(),
            config.auth.access_token_ttl(),
        );
        let auth = AuthService::new(
            store.clone(),
            tokens,
            PasswordHasher::new(config.auth.bcrypt_cost),
            clock.clone(),
        )
        .with_revoke_on_password_change(config.auth.revoke_sessions_on_password_change);

        Ok(Self {
            started_at: clock.now(),
            config: Arc::new(config),
            store,
            clock,
            auth,
            db_pool: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 데이터베이스 풀 설정.
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (self.clock.now() - self.started_at).num_seconds()
    }

    /// 저장소 연결 상태 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

/// 테스트용 AppState 생성.
///
/// 메모리 저장소, 수동 시계, 최소 bcrypt 비용, 고정 JWT 키를 사용하며
/// 요청 한도는 꺼져 있습니다. 시계를 함께 반환하므로 시간 경과를 흉내낼 수 있습니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> (Arc<AppState>, Arc<dealer_core::ManualClock>) {
    create_test_state_with(|_| {})
}

/// 테스트 기본 설정을 `configure`로 고친 뒤 AppState를 만듭니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state_with(
    configure: impl FnOnce(&mut AppConfig),
) -> (Arc<AppState>, Arc<dealer_core::ManualClock>) {
    use crate::store::InMemoryDealerStore;

    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some("test-secret-key-for-jwt-testing-minimum-32-chars".to_string());
    config.auth.bcrypt_cost = crate::auth::MIN_COST;
    config.rate_limit.enabled = false;
    configure(&mut config);

    let clock = Arc::new(dealer_core::ManualClock::starting_now());
    let store = Arc::new(InMemoryDealerStore::new(
        clock.clone(),
        config.auth.refresh_policy(),
    ));

    let state = AppState::new(config, store, clock.clone()).expect("Failed to create test AppState");
    (Arc::new(state), clock)
}
