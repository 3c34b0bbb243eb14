//! 인증 endpoint.
//!
//! `/api/auth` 아래에 등록, 로그인, 토큰 갱신, 로그아웃, 프로필 관리 경로를 둡니다.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use dealer_core::{
    AuthResponse, ChangePasswordRequest, ErrorBody, LoginRequest, LogoutRequest, MessageResponse,
    ProfileResponse, RefreshRequest, RegisterRequest, UpdateProfileRequest, VerifyResponse,
};
use std::sync::Arc;

use super::ApiJson;
use crate::auth::AuthDealer;
use crate::error::ApiResult;
use crate::state::AppState;

/// 딜러 등록.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "등록 성공", body = AuthResponse),
        (status = 400, description = "입력 오류 또는 중복 이메일", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// 로그인.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = AuthResponse),
        (status = 401, description = "잘못된 자격증명 또는 비활성 계정", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.login(req).await?))
}

/// Refresh Token 교체.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "새 토큰 쌍", body = AuthResponse),
        (status = 401, description = "INVALID_REFRESH_TOKEN 또는 ACCOUNT_INACTIVE", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.refresh(req).await?))
}

/// 로그아웃 (제시된 Refresh Token만 폐기).
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutRequest,
    responses((status = 200, description = "로그아웃", body = MessageResponse)),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    body: Option<ApiJson<LogoutRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    Ok(Json(state.auth.logout(req).await?))
}

/// 모든 기기에서 로그아웃.
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "모든 Refresh Token 폐기", body = MessageResponse),
        (status = 401, description = "인증 실패", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    AuthDealer(dealer): AuthDealer,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.auth.logout_all(&dealer).await?))
}

/// Access Token 검증.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "유효한 토큰", body = VerifyResponse),
        (status = 401, description = "NO_TOKEN, INVALID_TOKEN, TOKEN_EXPIRED, ACCOUNT_INACTIVE", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn verify(AuthDealer(dealer): AuthDealer) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        dealer,
    })
}

/// 프로필 조회.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "프로필", body = ProfileResponse),
        (status = 401, description = "인증 실패", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthDealer(dealer): AuthDealer,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(state.auth.profile(&dealer).await?))
}

/// 프로필 수정.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "수정된 프로필", body = ProfileResponse),
        (status = 400, description = "입력 오류 또는 중복 이메일", body = ErrorBody),
        (status = 401, description = "인증 실패", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthDealer(dealer): AuthDealer,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(state.auth.update_profile(&dealer, req).await?))
}

/// 비밀번호 변경.
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "변경 완료", body = MessageResponse),
        (status = 400, description = "현재 비밀번호 불일치 또는 입력 오류", body = ErrorBody),
        (status = 401, description = "인증 실패", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthDealer(dealer): AuthDealer,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.auth.change_password(&dealer, req).await?))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/verify", get(verify))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password))
}
