//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/` - 서비스 안내
//! - `/api/health` - 헬스 체크 (liveness)
//! - `/api/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/auth` - 등록, 로그인, 토큰 갱신, 로그아웃, 프로필
//! - `/api/admin` - 딜러 관리 (관리자 전용)
//!
//! 등록되지 않은 경로는 JSON 404를 반환합니다.

pub mod admin;
pub mod auth;
pub mod health;

pub use admin::admin_router;
pub use auth::auth_router;
pub use health::{
    health_router, ComponentHealth, ComponentStatus, HealthResponse, ReadinessResponse,
};

use axum::{
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request, State},
    http::{StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dealer_core::{ErrorBody, ErrorCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{metrics_layer, rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::openapi::swagger_ui_router;
use crate::state::AppState;

/// JSON 본문 추출기.
///
/// 본문 파싱 실패를 통일된 `VALIDATION_ERROR` 응답으로 바꿉니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::validation(rejection.body_text())
}

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(ApiJson(value))
    }
}

/// Content-Type 헤더가 없으면 `None`.
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(value.map(|Json(v)| ApiJson(v)))
    }
}

/// 서비스 안내 응답.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// 서비스 안내.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    let endpoints = BTreeMap::from([
        ("auth", "/api/auth"),
        ("admin", "/api/admin"),
        ("health", "/api/health"),
        ("docs", "/swagger-ui"),
        ("metrics", "/metrics"),
    ]);

    Json(IndexResponse {
        message: format!("{} (dealer authentication)", health::SERVICE_NAME),
        version: state.version.clone(),
        endpoints,
    })
}

/// 등록되지 않은 경로.
pub async fn route_not_found(uri: Uri) -> impl IntoResponse {
    let body = ErrorBody::new(
        "Route not found",
        format!("The route {} does not exist.", uri.path()),
    )
    .with_code(ErrorCode::NotFound);
    (StatusCode::NOT_FOUND, Json(body))
}

/// API 라우터 생성 (상태 미주입).
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .nest("/api/health", health_router())
        .nest("/api/auth", auth_router())
        .nest("/api/admin", admin_router())
        .fallback(route_not_found)
}

/// 상태를 주입하고 요청 한도, 문서, HTTP 메트릭을 붙인 전체 라우터를 만듭니다.
///
/// 요청 한도가 켜져 있으면 정리 태스크를 띄우므로 tokio 런타임 안에서 호출해야 합니다.
/// `/metrics`, 추적, 타임아웃, CORS 레이어는 바이너리에서 붙입니다.
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.config.rate_limit.clone();
    let api_router = create_api_router().with_state(state);

    let api_router = if settings.enabled {
        let config = RateLimitConfig::from(&settings);
        info!(
            max_requests = config.max_requests,
            window_secs = config.window.as_secs(),
            "Rate limiting configured"
        );
        let limiter = RateLimiter::new(config);
        limiter.spawn_cleanup();
        api_router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    } else {
        info!("Rate limiting DISABLED");
        api_router
    };

    Router::new()
        .merge(api_router)
        .merge(swagger_ui_router())
        .layer(middleware::from_fn(metrics_layer))
}
