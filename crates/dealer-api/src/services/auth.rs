//! 인증 흐름 (서버 측).
//!
//! 등록, 로그인, 토큰 갱신(rotation), 로그아웃, 전체 로그아웃, 비밀번호 변경,
//! 프로필 조회/수정, 관리자용 딜러 목록/활성 상태 변경을 처리합니다.

use dealer_core::{
    normalize_email, AuthResponse, ChangePasswordRequest, Clock, Dealer, DealerListResponse,
    DealerProfile, DealerRole, DealerStatusResponse, LoginRequest, LogoutRequest,
    MessageResponse, NewDealer, ProfileResponse, RefreshRequest, RegisterRequest,
    SetActiveRequest, UpdateProfileRequest,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{PasswordHasher, TokenPair, TokenService};
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_auth_event;
use crate::store::DealerStore;

const TOKEN_TYPE: &str = "Bearer";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn DealerStore>,
    tokens: TokenService,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    revoke_on_password_change: bool,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn DealerStore>,
        tokens: TokenService,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
            clock,
            revoke_on_password_change: false,
        }
    }

    /// 비밀번호 변경 시 모든 Refresh Token 폐기 여부.
    pub fn with_revoke_on_password_change(mut self, enabled: bool) -> Self {
        self.revoke_on_password_change = enabled;
        self
    }

    fn auth_response(message: &str, dealer: &Dealer, pair: TokenPair) -> AuthResponse {
        AuthResponse {
            message: Some(message.to_string()),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            token_type: TOKEN_TYPE.to_string(),
            dealer: dealer.profile(),
        }
    }

    /// Access Token을 검증하고 활성 딜러의 프로필을 반환합니다.
    pub async fn authenticate(&self, token: &str) -> ApiResult<DealerProfile> {
        let claims = self.tokens.verify_access_token(token)?;
        let id = claims.dealer_id().ok_or(ApiError::InvalidToken)?;

        let dealer = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if !dealer.is_active {
            return Err(ApiError::AccountInactive);
        }
        Ok(dealer.profile())
    }

    /// 딜러 등록.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        let req = RegisterRequest {
            email: normalize_email(&req.email),
            name: req.name.trim().to_string(),
            ..req
        };
        req.validate()?;

        let role = match req.role.as_deref() {
            Some(role) => DealerRole::parse(role)
                .ok_or_else(|| ApiError::validation("Role must be either admin or dealer"))?,
            None => DealerRole::Dealer,
        };

        if self.store.find_by_email(&req.email).await?.is_some() {
            record_auth_event("register", "duplicate");
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&req.password).await?;
        let dealer = self
            .store
            .create(NewDealer {
                email: req.email,
                password_hash,
                name: req.name,
                role,
            })
            .await?;

        let pair = self.tokens.issue_pair(&dealer).await?;

        info!(dealer_id = %dealer.id, email = %dealer.email, role = %dealer.role, "Dealer registered");
        record_auth_event("register", "success");

        Ok(Self::auth_response("Dealer registered successfully", &dealer, pair))
    }

    /// 로그인.
    ///
    /// 없는 이메일과 틀린 비밀번호는 같은 메시지로 거부합니다.
    /// 비밀번호가 맞는 경우에만 비활성 계정임을 알려줍니다.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        let req = LoginRequest {
            email: normalize_email(&req.email),
            ..req
        };
        req.validate()?;

        let Some(dealer) = self.store.find_by_email(&req.email).await? else {
            record_auth_event("login", "invalid_credentials");
            return Err(ApiError::InvalidCredentials);
        };

        if !self.hasher.verify(&req.password, &dealer.password_hash).await? {
            warn!(dealer_id = %dealer.id, "Login failed: wrong password");
            record_auth_event("login", "invalid_credentials");
            return Err(ApiError::InvalidCredentials);
        }

        if !dealer.is_active {
            warn!(dealer_id = %dealer.id, code = "ACCOUNT_INACTIVE", "Login rejected");
            record_auth_event("login", "inactive");
            return Err(ApiError::AccountInactive);
        }

        let dealer = self.store.record_login(dealer.id, self.clock.now()).await?;
        let pair = self.tokens.issue_pair(&dealer).await?;

        info!(dealer_id = %dealer.id, "Dealer logged in");
        record_auth_event("login", "success");

        Ok(Self::auth_response("Login successful", &dealer, pair))
    }

    /// Refresh Token으로 새 토큰 쌍을 발급합니다.
    ///
    /// 제시된 토큰은 한 번만 쓸 수 있으며, 제거와 새 토큰 추가가 한 번의 쓰기로 적용됩니다.
    pub async fn refresh(&self, req: RefreshRequest) -> ApiResult<AuthResponse> {
        let presented = req.refresh_token.trim();
        if presented.is_empty() {
            record_auth_event("refresh", "invalid");
            return Err(ApiError::InvalidRefreshToken);
        }

        let Some(dealer) = self.store.find_by_refresh_token(presented).await? else {
            record_auth_event("refresh", "invalid");
            return Err(ApiError::InvalidRefreshToken);
        };

        if !dealer.is_active {
            warn!(dealer_id = %dealer.id, code = "ACCOUNT_INACTIVE", "Refresh rejected");
            record_auth_event("refresh", "inactive");
            return Err(ApiError::AccountInactive);
        }

        // 동시에 같은 토큰으로 갱신하면 한쪽만 성공한다
        let Some(refresh_token) = self
            .tokens
            .rotate_refresh_token(dealer.id, presented)
            .await?
        else {
            warn!(dealer_id = %dealer.id, "Refresh token already rotated");
            record_auth_event("refresh", "invalid");
            return Err(ApiError::InvalidRefreshToken);
        };

        let access_token = self.tokens.issue_access_token(&dealer.profile())?;
        record_auth_event("refresh", "success");

        Ok(Self::auth_response(
            "Token refreshed successfully",
            &dealer,
            TokenPair {
                access_token,
                refresh_token,
                expires_in: self.tokens.access_ttl().num_seconds(),
            },
        ))
    }

    /// 제시된 Refresh Token 하나만 폐기합니다. 이미 없어도 성공합니다.
    pub async fn logout(&self, req: LogoutRequest) -> ApiResult<MessageResponse> {
        if let Some(token) = req.refresh_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(dealer) = self.store.find_by_refresh_token(token).await? {
                self.tokens.remove_refresh_token(dealer.id, token).await?;
                info!(dealer_id = %dealer.id, "Dealer logged out");
            }
        }
        record_auth_event("logout", "success");
        Ok(MessageResponse::new("Logged out successfully"))
    }

    /// 모든 기기에서 로그아웃.
    pub async fn logout_all(&self, dealer: &DealerProfile) -> ApiResult<MessageResponse> {
        self.tokens.remove_all_refresh_tokens(dealer.id).await?;
        info!(dealer_id = %dealer.id, "Dealer logged out from all devices");
        record_auth_event("logout_all", "success");
        Ok(MessageResponse::new("Logged out from all devices successfully"))
    }

    /// 비밀번호 변경.
    pub async fn change_password(
        &self,
        dealer: &DealerProfile,
        req: ChangePasswordRequest,
    ) -> ApiResult<MessageResponse> {
        req.validate()?;

        let stored = self
            .store
            .find_by_id(dealer.id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if !self.hasher.verify(&req.current_password, &stored.password_hash).await? {
            record_auth_event("change_password", "invalid_current_password");
            return Err(ApiError::InvalidCurrentPassword);
        }

        let password_hash = self.hasher.hash(&req.new_password).await?;
        self.store.update_password(dealer.id, password_hash).await?;

        if self.revoke_on_password_change {
            self.tokens.remove_all_refresh_tokens(dealer.id).await?;
        }

        info!(
            dealer_id = %dealer.id,
            sessions_revoked = self.revoke_on_password_change,
            "Password changed"
        );
        record_auth_event("change_password", "success");
        Ok(MessageResponse::new("Password changed successfully"))
    }

    pub async fn profile(&self, dealer: &DealerProfile) -> ApiResult<ProfileResponse> {
        let stored = self
            .store
            .find_by_id(dealer.id)
            .await?
            .ok_or(ApiError::InvalidToken)?;
        Ok(ProfileResponse {
            message: None,
            dealer: stored.profile(),
        })
    }

    /// 이름/이메일 수정. 이메일은 다른 딜러가 쓰고 있으면 거부합니다.
    pub async fn update_profile(
        &self,
        dealer: &DealerProfile,
        req: UpdateProfileRequest,
    ) -> ApiResult<ProfileResponse> {
        let req = UpdateProfileRequest {
            name: req.name.map(|n| n.trim().to_string()),
            email: req.email.map(|e| normalize_email(&e)),
        };
        req.validate()?;

        let email = req.email.filter(|e| *e != dealer.email);
        if let Some(email) = email.as_deref() {
            if self.store.find_by_email(email).await?.is_some() {
                return Err(ApiError::DuplicateEmail);
            }
        }

        let updated = self.store.update_profile(dealer.id, req.name, email).await?;
        info!(dealer_id = %updated.id, "Profile updated");

        Ok(ProfileResponse {
            message: Some("Profile updated successfully".to_string()),
            dealer: updated.profile(),
        })
    }

    pub async fn list_dealers(&self) -> ApiResult<DealerListResponse> {
        let dealers: Vec<DealerProfile> = self
            .store
            .list()
            .await?
            .iter()
            .map(Dealer::profile)
            .collect();
        Ok(DealerListResponse {
            total: dealers.len(),
            dealers,
        })
    }

    /// 딜러 활성 상태 변경 (관리자). 자기 자신은 비활성화할 수 없습니다.
    pub async fn set_active(
        &self,
        admin: &DealerProfile,
        id: Uuid,
        req: SetActiveRequest,
    ) -> ApiResult<DealerStatusResponse> {
        if admin.id == id && !req.is_active {
            return Err(ApiError::validation("Cannot deactivate your own account"));
        }

        let dealer = self.store.set_active(id, req.is_active).await?;
        info!(
            dealer_id = %dealer.id,
            admin_id = %admin.id,
            is_active = dealer.is_active,
            "Dealer status changed"
        );

        Ok(DealerStatusResponse {
            id: dealer.id,
            is_active: dealer.is_active,
        })
    }
}
