//! OpenAPI 문서화 설정.
//!
//! utoipa로 REST API의 OpenAPI 3.0 문서를 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새 엔드포인트를 추가할 때:
//!
//! 1. 요청/응답 타입에 `ToSchema` 추가 (`dealer-core`는 `utoipa-support` feature)
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)`에 추가

use axum::Router;
use dealer_core::{
    AuthResponse, ChangePasswordRequest, DealerListResponse, DealerProfile, DealerRole,
    DealerStatusResponse, ErrorBody, ErrorCode, LoginRequest, LogoutRequest, MessageResponse,
    ProfileResponse, RefreshRequest, RegisterRequest, SetActiveRequest, UpdateProfileRequest,
    VerifyResponse,
};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::{ComponentHealth, ComponentStatus, HealthResponse, ReadinessResponse};

/// Bearer 인증 스키마 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Dealer API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Auto Universe Dealer API",
        description = r#"
# 딜러 인증 REST API

딜러 계정 등록, 로그인, 토큰 갱신, 로그아웃을 위한 API입니다.

## 인증

보호된 엔드포인트는 `Authorization: Bearer <accessToken>` 헤더가 필요합니다.
Access Token은 15분 동안 유효하며, 만료되면 `TOKEN_EXPIRED` 코드로 401을 반환합니다.
이때 `/api/auth/refresh`로 새 토큰 쌍을 받으세요. Refresh Token은 한 번만 사용할 수 있습니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:5000", description = "로컬 개발 서버"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 등록, 로그인, 토큰 갱신, 로그아웃"),
        (name = "admin", description = "관리자 - 딜러 관리")
    ),
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ReadinessResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ErrorBody,
            ErrorCode,
            MessageResponse,
            DealerProfile,
            DealerRole,

            // ===== Auth =====
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            LogoutRequest,
            UpdateProfileRequest,
            ChangePasswordRequest,
            AuthResponse,
            VerifyResponse,
            ProfileResponse,

            // ===== Admin =====
            SetActiveRequest,
            DealerListResponse,
            DealerStatusResponse,
        )
    ),
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::logout_all,
        crate::routes::auth::verify,
        crate::routes::auth::get_profile,
        crate::routes::auth::update_profile,
        crate::routes::auth::change_password,

        // ===== Admin =====
        crate::routes::admin::list_dealers,
        crate::routes::admin::set_dealer_status,
    )
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
