//! 딜러 인증 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 자격증명 저장소 (PostgreSQL / 메모리)
//! - Access/Refresh Token 발급, 교체, 폐기
//! - Axum 인증 추출기 (Bearer 토큰, 관리자 권한)
//! - 헬스 체크, Prometheus 메트릭, OpenAPI 문서
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`store`]: 자격증명 저장소
//! - [`auth`]: JWT, 비밀번호 해싱, 토큰 서비스, 인증 추출기
//! - [`services`]: 인증 흐름
//! - [`routes`]: REST API 엔드포인트
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어 (요청 한도, 메트릭)
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use auth::{AdminDealer, AuthDealer, TokenPair, TokenService};
pub use error::{ApiError, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use routes::{create_api_router, create_router};
pub use services::AuthService;
pub use state::AppState;
pub use store::{DealerStore, InMemoryDealerStore, PgDealerStore, StoreError};

#[cfg(any(test, feature = "test-utils"))]
pub use state::{create_test_state, create_test_state_with};
