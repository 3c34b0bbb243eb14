//! 관리자 endpoint.
//!
//! 모든 경로는 [`AdminDealer`] 추출기로 보호됩니다 (비관리자는 403).

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use dealer_core::{DealerListResponse, DealerStatusResponse, ErrorBody, SetActiveRequest};
use std::sync::Arc;
use uuid::Uuid;

use super::ApiJson;
use crate::auth::AdminDealer;
use crate::error::ApiResult;
use crate::state::AppState;

/// 딜러 목록.
#[utoipa::path(
    get,
    path = "/api/admin/dealers",
    responses(
        (status = 200, description = "딜러 목록", body = DealerListResponse),
        (status = 401, description = "인증 실패", body = ErrorBody),
        (status = 403, description = "관리자 권한 필요", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_dealers(
    State(state): State<Arc<AppState>>,
    AdminDealer(_admin): AdminDealer,
) -> ApiResult<Json<DealerListResponse>> {
    Ok(Json(state.auth.list_dealers().await?))
}

/// 딜러 활성/비활성 전환.
#[utoipa::path(
    put,
    path = "/api/admin/dealers/{id}/status",
    params(("id" = Uuid, Path, description = "딜러 ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "변경된 상태", body = DealerStatusResponse),
        (status = 400, description = "자기 자신 비활성화 시도", body = ErrorBody),
        (status = 403, description = "관리자 권한 필요", body = ErrorBody),
        (status = 404, description = "딜러 없음", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn set_dealer_status(
    State(state): State<Arc<AppState>>,
    AdminDealer(admin): AdminDealer,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> ApiResult<Json<DealerStatusResponse>> {
    Ok(Json(state.auth.set_active(&admin, id, req).await?))
}

/// 관리자 라우터 생성.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dealers", get(list_dealers))
        .route("/dealers/{id}/status", put(set_dealer_status))
}
