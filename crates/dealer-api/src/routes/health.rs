//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템에서 사용합니다.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Auto Universe API";

/// 간단한 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 항상 "OK"
    pub status: String,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    pub service: String,
}

/// 상세 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    /// "healthy" | "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub timestamp: String,
    pub components: ComponentHealth,
}

/// 개별 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    /// 자격증명 저장소
    pub store: ComponentStatus,
    /// PostgreSQL 연결 (메모리 저장소면 not_configured)
    pub database: ComponentStatus,
}

/// 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatus {
    /// "up" | "down" | "not_configured"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    pub fn up() -> Self {
        Self {
            status: "up".to_string(),
            message: None,
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            message: None,
        }
    }
}

/// 간단한 헬스 체크 (liveness).
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "서버 동작 중", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: state.clock.now().to_rfc3339(),
        service: SERVICE_NAME.to_string(),
    })
}

/// 상세 헬스 체크 (readiness). 저장소에 실제로 질의합니다.
#[utoipa::path(
    get,
    path = "/api/health/ready",
    responses(
        (status = 200, description = "모든 컴포넌트 정상", body = ReadinessResponse),
        (status = 503, description = "저장소 연결 실패", body = ReadinessResponse)
    ),
    tag = "health"
)]
pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_up = state.is_store_healthy().await;

    let store = if store_up {
        ComponentStatus::up()
    } else {
        ComponentStatus::down("연결 실패")
    };
    let database = match (&state.db_pool, store_up) {
        (None, _) => ComponentStatus::not_configured(),
        (Some(_), true) => ComponentStatus::up(),
        (Some(_), false) => ComponentStatus::down("연결 실패"),
    };

    let (status, status_code) = if store_up {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = ReadinessResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        timestamp: state.clock.now().to_rfc3339(),
        components: ComponentHealth { store, database },
    };

    (status_code, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(health_ready))
}
