//! 클라이언트 세션 관리자.
//!
//! 애플리케이션 코드가 Access/Refresh Token 교환을 신경 쓰지 않도록 합니다:
//! - 모든 요청에 현재 Access Token을 붙임
//! - `TOKEN_EXPIRED` 응답을 받으면 한 번만 갱신하고 요청을 다시 보냄
//! - Access Token 수명보다 조금 짧은 주기로 미리 갱신
//! - 갱신이 거부되면 로컬 토큰을 모두 지우고 `Unauthenticated` 상태를 알림
//!
//! 동시에 여러 갱신 계기(만료 응답, 타이머, 직접 호출)가 겹쳐도 서버에는 갱신 요청이 하나만 나갑니다.
//! 토큰 세대(generation)는 토큰이 바뀔 때마다 증가하며, 각 계기는 잠금을 얻기 전에 본 세대를 기억합니다.
//! 잠금을 얻었을 때 세대가 이미 바뀌었다면 서버에 요청하지 않고 그 결과를 공유합니다.

use dealer_core::{AuthResponse, DealerProfile, LoginRequest, RegisterRequest};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::storage::{StoredTokens, TokenStorage};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// 선제 갱신 주기 (Access Token 수명 15분보다 1분 짧게).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(14 * 60);

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const REFRESH_PATH: &str = "/api/auth/refresh";
const LOGOUT_PATH: &str = "/api/auth/logout";
const LOGOUT_ALL_PATH: &str = "/api/auth/logout-all";

/// 세션 설정.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_interval: Duration,
    /// `false`면 선제 갱신 타이머를 사용하지 않음
    pub auto_refresh: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            auto_refresh: true,
        }
    }
}

/// 애플리케이션에 알리는 세션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

/// 현재 토큰과 세대.
#[derive(Debug, Default)]
struct TokenSlot {
    tokens: Option<StoredTokens>,
    /// 토큰이 설정되거나 지워질 때마다 증가
    generation: u64,
}

struct Inner {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn TokenStorage>,
    config: SessionConfig,
    tokens: RwLock<TokenSlot>,
    /// 한 번에 하나의 갱신만 진행 (대기자는 도착 순서대로)
    refresh_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
    /// 다음 선제 갱신 시각 (`None`이면 해제)
    schedule: watch::Sender<Option<Instant>>,
    shutdown: CancellationToken,
}

/// 세션 관리자.
///
/// 애플리케이션마다 하나를 만들어 복제해서 사용합니다.
/// tokio 런타임 안에서 생성해야 합니다 (선제 갱신 타이머 태스크).
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// 새 세션 관리자 생성.
    ///
    /// 저장소에 토큰이 있으면 세션을 복원하고 타이머를 시작합니다.
    pub async fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        let stored = storage.load().await?;
        let restored = stored.is_some();
        let initial = if restored {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };

        let (state, _) = watch::channel(initial);
        let (schedule, schedule_rx) = watch::channel(None);
        let auto_refresh = config.auto_refresh;

        let manager = Self {
            inner: Arc::new(Inner {
                transport,
                storage,
                config,
                tokens: RwLock::new(TokenSlot {
                    tokens: stored,
                    generation: 0,
                }),
                refresh_lock: Mutex::new(()),
                state,
                schedule,
                shutdown: CancellationToken::new(),
            }),
        };

        if auto_refresh {
            tokio::spawn(run_refresh_timer(
                Arc::downgrade(&manager.inner),
                schedule_rx,
                manager.inner.shutdown.clone(),
            ));
        }

        if restored {
            info!("Session restored from storage");
            manager.arm_timer();
        }

        Ok(manager)
    }

    /// 로그인.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<DealerProfile> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.start_session(ApiRequest::post(LOGIN_PATH).with_body(body))
            .await
    }

    /// 회원가입 후 바로 로그인 상태가 됩니다.
    pub async fn register(&self, request: &RegisterRequest) -> SessionResult<DealerProfile> {
        let body = serde_json::to_value(request)?;
        self.start_session(ApiRequest::post(REGISTER_PATH).with_body(body))
            .await
    }

    /// 외부에서 받은 토큰 쌍으로 세션 시작.
    pub async fn set_tokens(&self, tokens: StoredTokens) -> SessionResult<()> {
        self.store_tokens(tokens).await;
        Ok(())
    }

    /// 인증이 필요한 API 호출.
    ///
    /// `TOKEN_EXPIRED`를 받으면 갱신 후 한 번만 다시 보냅니다.
    /// 재전송도 만료로 실패하면 그 에러를 그대로 반환합니다.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> SessionResult<ApiResponse> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: None,
        };

        let (sent_with, seen) = self.snapshot().await;
        let had_token = sent_with.is_some();
        let response = self
            .inner
            .transport
            .send(request.clone().with_bearer(sent_with))
            .await?;

        match response.error_code() {
            Some(code) if had_token && code.is_retryable() => {}
            _ => return response.ensure_success(),
        }

        debug!(path, "Access token expired, refreshing before replay");
        self.refresh_since(seen).await?;

        let (retry_with, _) = self.snapshot().await;
        self.inner
            .transport
            .send(request.with_bearer(retry_with))
            .await?
            .ensure_success()
    }

    /// [`call`](Self::call) 후 본문을 역직렬화합니다.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> SessionResult<T> {
        self.call(method, path, body).await?.json()
    }

    /// 토큰 갱신.
    ///
    /// 이미 진행 중인 갱신이 있으면 새로 요청하지 않고 그 결과를 기다립니다.
    pub async fn refresh(&self) -> SessionResult<()> {
        let (_, seen) = self.snapshot().await;
        self.refresh_since(seen).await
    }

    /// 로그아웃.
    ///
    /// 서버 폐기 요청이 실패해도 로컬 세션은 지웁니다.
    pub async fn logout(&self) -> SessionResult<()> {
        let refresh_token = self
            .inner
            .tokens
            .read()
            .await
            .tokens
            .as_ref()
            .map(|t| t.refresh_token.clone());

        if let Some(token) = refresh_token {
            let request = ApiRequest::post(LOGOUT_PATH).with_body(json!({ "refreshToken": token }));
            match self
                .inner
                .transport
                .send(request)
                .await
                .and_then(ApiResponse::ensure_success)
            {
                Ok(_) => debug!("Refresh token revoked on server"),
                Err(e) => warn!(error = %e, "Server logout failed, clearing local session anyway"),
            }
        }

        self.clear_session().await?;
        info!("Logged out");
        Ok(())
    }

    /// 모든 기기에서 로그아웃.
    pub async fn logout_all(&self) -> SessionResult<()> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        let result = self.call(Method::POST, LOGOUT_ALL_PATH, None).await;
        self.clear_session().await?;
        result.map(|_| info!("Logged out from all devices"))
    }

    pub fn is_authenticated(&self) -> bool {
        *self.inner.state.borrow() == SessionState::Authenticated
    }

    pub async fn tokens(&self) -> Option<StoredTokens> {
        self.inner.tokens.read().await.tokens.clone()
    }

    /// 세션 상태 변경 구독.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// 선제 갱신 타이머 종료.
    pub fn shutdown(&self) {
        self.inner.schedule.send_replace(None);
        self.inner.shutdown.cancel();
    }

    // ==================== 내부 ====================

    /// 현재 Access Token과 세대.
    async fn snapshot(&self) -> (Option<String>, u64) {
        let slot = self.inner.tokens.read().await;
        let access = slot.tokens.as_ref().map(|t| t.access_token.clone());
        (access, slot.generation)
    }

    async fn start_session(&self, request: ApiRequest) -> SessionResult<DealerProfile> {
        let auth: AuthResponse = self
            .inner
            .transport
            .send(request)
            .await?
            .ensure_success()?
            .json()?;

        self.store_tokens(StoredTokens::new(auth.access_token, auth.refresh_token))
            .await;
        info!(dealer_id = %auth.dealer.id, "Session started");
        Ok(auth.dealer)
    }

    /// 메모리 토큰을 먼저 교체하고 저장소에는 최선을 다해 기록합니다.
    ///
    /// 서버가 이미 Refresh Token을 회전시켰으므로 저장 실패로 새 토큰을 버리면 안 됩니다.
    async fn store_tokens(&self, tokens: StoredTokens) {
        {
            let mut slot = self.inner.tokens.write().await;
            slot.tokens = Some(tokens.clone());
            slot.generation += 1;
        }
        self.publish(SessionState::Authenticated);
        self.arm_timer();

        if let Err(e) = self.inner.storage.save(&tokens).await {
            warn!(error = %e, "Failed to persist tokens, keeping in-memory session");
        }
    }

    /// 단일 갱신.
    ///
    /// `seen`은 호출자가 갱신이 필요하다고 판단한 시점의 세대입니다.
    /// 잠금을 얻은 뒤 세대가 바뀌어 있으면 서버에 요청하지 않습니다.
    async fn refresh_since(&self, seen: u64) -> SessionResult<()> {
        let _guard = self.inner.refresh_lock.lock().await;

        let (current, generation) = {
            let slot = self.inner.tokens.read().await;
            (slot.tokens.clone(), slot.generation)
        };

        if generation != seen {
            debug!("Tokens already replaced by another caller");
            return match current {
                Some(_) => Ok(()),
                None => Err(SessionError::SessionExpired),
            };
        }

        let Some(current) = current else {
            return Err(SessionError::NotAuthenticated);
        };

        let request = ApiRequest::post(REFRESH_PATH)
            .with_body(json!({ "refreshToken": current.refresh_token }));
        let response = self.inner.transport.send(request).await?;

        if response.is_success() {
            let auth: AuthResponse = response.json()?;
            self.store_tokens(StoredTokens::new(auth.access_token, auth.refresh_token))
                .await;
            info!("Session refreshed");
            return Ok(());
        }

        if is_terminal(response.status) {
            warn!(
                status = response.status,
                code = ?response.error_code(),
                "Refresh rejected, ending session"
            );
            if let Err(e) = self.clear_session().await {
                warn!(error = %e, "Failed to clear token storage");
            }
            return Err(SessionError::SessionExpired);
        }

        Err(response.into_error())
    }

    async fn clear_session(&self) -> SessionResult<()> {
        {
            let mut slot = self.inner.tokens.write().await;
            slot.tokens = None;
            slot.generation += 1;
        }
        self.inner.schedule.send_replace(None);
        self.publish(SessionState::Unauthenticated);
        self.inner.storage.clear().await
    }

    fn arm_timer(&self) {
        if self.inner.config.auto_refresh {
            let deadline = Instant::now() + self.inner.config.refresh_interval;
            self.inner.schedule.send_replace(Some(deadline));
        }
    }

    fn publish(&self, next: SessionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// 갱신 요청에 대한 4xx 응답은 재시도하지 않습니다 (429 제외).
fn is_terminal(status: u16) -> bool {
    (400..500).contains(&status) && status != 429
}

/// 선제 갱신 타이머.
///
/// 예약 시각이 바뀔 때마다 다시 대기합니다. 관리자가 모두 해제되면 종료합니다.
async fn run_refresh_timer(
    inner: Weak<Inner>,
    mut schedule: watch::Receiver<Option<Instant>>,
    shutdown: CancellationToken,
) {
    loop {
        let deadline = *schedule.borrow_and_update();
        let fire = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = schedule.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = fire => {
                let Some(inner) = inner.upgrade() else { break };
                inner.schedule.send_replace(None);

                debug!("Proactive refresh timer fired");
                let manager = SessionManager { inner };
                if let Err(e) = manager.refresh().await {
                    warn!(error = %e, "Proactive token refresh failed");
                }
            }
        }
    }

    debug!("Refresh timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStorage;
    use dealer_core::ErrorCode;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    const ALWAYS_EXPIRED: &str = "/api/always-expired";
    const INVALID_TOKEN: &str = "/api/invalid-token";

    #[derive(Default)]
    struct FakeServerState {
        next_id: u32,
        access: HashSet<String>,
        refresh: HashSet<String>,
        refresh_calls: usize,
        paths: Vec<String>,
    }

    /// 토큰 발급/검증만 흉내 내는 서버.
    struct FakeServer {
        state: StdMutex<FakeServerState>,
        refresh_delay: Duration,
    }

    impl FakeServer {
        fn new() -> Arc<Self> {
            Self::with_refresh_delay(Duration::ZERO)
        }

        fn with_refresh_delay(refresh_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                state: StdMutex::new(FakeServerState::default()),
                refresh_delay,
            })
        }

        fn issue(state: &mut FakeServerState) -> ApiResponse {
            state.next_id += 1;
            let access = format!("access-{}", state.next_id);
            let refresh = format!("refresh-{}", state.next_id);
            state.access.insert(access.clone());
            state.refresh.insert(refresh.clone());

            ApiResponse::new(
                200,
                json!({
                    "accessToken": access,
                    "refreshToken": refresh,
                    "expiresIn": 900,
                    "tokenType": "Bearer",
                    "dealer": {
                        "id": "5f0c5f8e-0000-4000-8000-000000000001",
                        "email": "a@x.com",
                        "name": "Alice",
                        "role": "dealer",
                        "isActive": true,
                        "createdAt": "2024-01-01T00:00:00Z",
                        "updatedAt": "2024-01-01T00:00:00Z"
                    }
                }),
            )
        }

        fn error(status: u16, code: &str, message: &str) -> ApiResponse {
            ApiResponse::new(
                status,
                json!({ "error": "Access denied", "message": message, "code": code }),
            )
        }

        fn expire_access_tokens(&self) {
            self.state.lock().unwrap().access.clear();
        }

        fn revoke_refresh_tokens(&self) {
            self.state.lock().unwrap().refresh.clear();
        }

        fn refresh_calls(&self) -> usize {
            self.state.lock().unwrap().refresh_calls
        }

        fn has_refresh_token(&self, token: &str) -> bool {
            self.state.lock().unwrap().refresh.contains(token)
        }

        fn requested(&self, path: &str) -> bool {
            self.state.lock().unwrap().paths.iter().any(|p| p == path)
        }
    }

    fn body_str(request: &ApiRequest, field: &str) -> String {
        request
            .body
            .as_ref()
            .and_then(|b| b[field].as_str())
            .unwrap_or_default()
            .to_string()
    }

    #[async_trait]
    impl Transport for FakeServer {
        async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
            self.state.lock().unwrap().paths.push(request.path.clone());

            match request.path.as_str() {
                LOGIN_PATH => {
                    if body_str(&request, "password") != "secret1" {
                        return Ok(Self::error(401, "INVALID_CREDENTIALS", "Invalid email or password"));
                    }
                    Ok(Self::issue(&mut self.state.lock().unwrap()))
                }
                REFRESH_PATH => {
                    self.state.lock().unwrap().refresh_calls += 1;
                    if !self.refresh_delay.is_zero() {
                        tokio::time::sleep(self.refresh_delay).await;
                    }

                    let token = body_str(&request, "refreshToken");
                    let mut state = self.state.lock().unwrap();
                    if state.refresh.remove(&token) {
                        Ok(Self::issue(&mut state))
                    } else {
                        Ok(Self::error(401, "INVALID_REFRESH_TOKEN", "Invalid or expired refresh token"))
                    }
                }
                LOGOUT_PATH => {
                    let token = body_str(&request, "refreshToken");
                    self.state.lock().unwrap().refresh.remove(&token);
                    Ok(ApiResponse::new(200, json!({ "message": "Logged out successfully" })))
                }
                path => {
                    let mut state = self.state.lock().unwrap();
                    let Some(bearer) = request.bearer.as_deref() else {
                        return Ok(Self::error(401, "NO_TOKEN", "No token provided"));
                    };
                    if path == INVALID_TOKEN {
                        return Ok(Self::error(401, "INVALID_TOKEN", "Invalid token"));
                    }
                    if path == ALWAYS_EXPIRED || !state.access.contains(bearer) {
                        return Ok(Self::error(401, "TOKEN_EXPIRED", "Token expired"));
                    }
                    if path == LOGOUT_ALL_PATH {
                        state.refresh.clear();
                    }
                    Ok(ApiResponse::new(200, json!({ "path": path, "token": bearer })))
                }
            }
        }
    }

    async fn manager(server: &Arc<FakeServer>, storage: &Arc<MemoryTokenStorage>) -> SessionManager {
        SessionManager::new(server.clone(), storage.clone(), SessionConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_persists_tokens_and_publishes_state() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        let mut state = session.subscribe();
        assert_eq!(*state.borrow(), SessionState::Unauthenticated);

        let dealer = session.login("a@x.com", "secret1").await.unwrap();
        assert_eq!(dealer.email, "a@x.com");
        assert!(session.is_authenticated());
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), SessionState::Authenticated);
        assert_eq!(storage.load().await.unwrap(), session.tokens().await);

        let response = session.call(Method::GET, "/api/cars", None).await.unwrap();
        assert_eq!(response.body["token"], "access-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_leaves_session_empty() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;

        let err = session.login("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidCredentials));
        assert!(!session.is_authenticated());
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_access_token_is_refreshed_and_replayed() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        server.expire_access_tokens();
        let response = session.call(Method::GET, "/api/cars", None).await.unwrap();

        assert_eq!(response.body["token"], "access-2");
        assert_eq!(server.refresh_calls(), 1);
        assert!(!server.has_refresh_token("refresh-1"));
        assert_eq!(
            storage.load().await.unwrap(),
            Some(StoredTokens::new("access-2", "refresh-2"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_expired_calls_share_one_refresh() {
        let server = FakeServer::with_refresh_delay(Duration::from_millis(100));
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();
        server.expire_access_tokens();

        let results = futures::future::join_all(
            (0..5).map(|_| session.call(Method::GET, "/api/cars", None)),
        )
        .await;

        assert_eq!(server.refresh_calls(), 1);
        for result in results {
            assert_eq!(result.unwrap().body["token"], "access-2");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_calls_share_one_request() {
        let server = FakeServer::with_refresh_delay(Duration::from_millis(100));
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        let (a, b, c) = tokio::join!(session.refresh(), session.refresh(), session.refresh());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(server.refresh_calls(), 1);
        assert_eq!(
            session.tokens().await,
            Some(StoredTokens::new("access-2", "refresh-2"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_during_expired_call_refresh_does_not_refresh_again() {
        let server = FakeServer::with_refresh_delay(Duration::from_secs(5));
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        // 만료 응답으로 시작된 갱신이 진행 중일 때 타이머가 발화
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL - Duration::from_secs(2)).await;
        server.expire_access_tokens();
        let response = session.call(Method::GET, "/api/cars", None).await.unwrap();
        assert_eq!(response.body["token"], "access-2");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(server.refresh_calls(), 1);
        assert!(server.has_refresh_token("refresh-2"));
        assert!(session.is_authenticated());
    }

    /// 저장만 항상 실패하는 저장소.
    struct FailingStorage;

    #[async_trait]
    impl TokenStorage for FailingStorage {
        async fn load(&self) -> SessionResult<Option<StoredTokens>> {
            Ok(None)
        }

        async fn save(&self, _tokens: &StoredTokens) -> SessionResult<()> {
            Err(SessionError::Storage("disk full".into()))
        }

        async fn clear(&self) -> SessionResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_keeps_rotated_tokens() {
        let server = FakeServer::new();
        let session = SessionManager::new(
            server.clone(),
            Arc::new(FailingStorage),
            SessionConfig::default(),
        )
        .await
        .unwrap();
        session.login("a@x.com", "secret1").await.unwrap();
        assert!(session.is_authenticated());

        session.refresh().await.unwrap();
        assert_eq!(
            session.tokens().await,
            Some(StoredTokens::new("access-2", "refresh-2"))
        );

        // 회전된 토큰으로 다시 갱신 가능
        session.refresh().await.unwrap();
        assert_eq!(server.refresh_calls(), 2);
        assert!(server.has_refresh_token("refresh-3"));
        assert!(session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_retryable_codes_trigger_refresh() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        let err = session.call(Method::GET, INVALID_TOKEN, None).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidToken));
        assert_eq!(server.refresh_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_rejection_ends_session() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();
        let mut state = session.subscribe();

        server.expire_access_tokens();
        server.revoke_refresh_tokens();

        let err = session.call(Method::GET, "/api/cars", None).await.unwrap_err();
        assert!(matches!(err, SessionError::SessionExpired));
        assert!(!session.is_authenticated());
        assert!(session.tokens().await.is_none());
        assert!(storage.load().await.unwrap().is_none());
        assert_eq!(*state.borrow_and_update(), SessionState::Unauthenticated);

        // 토큰 없이 보내면 서버가 거부
        let err = session.call(Method::GET, "/api/cars", None).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoToken));
        assert_eq!(server.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_happens_only_once() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        let err = session.call(Method::GET, ALWAYS_EXPIRED, None).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TokenExpired));
        assert_eq!(server.refresh_calls(), 1);
        assert!(session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_proactive_refresh_before_expiry() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(server.refresh_calls(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(server.refresh_calls(), 1);
        assert_eq!(
            session.tokens().await,
            Some(StoredTokens::new("access-2", "refresh-2"))
        );

        // 갱신 후 다시 예약됨
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL).await;
        assert_eq!(server.refresh_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_revokes_and_stops_timer() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        session.logout().await.unwrap();
        assert!(!session.is_authenticated());
        assert!(server.requested(LOGOUT_PATH));
        assert!(!server.has_refresh_token("refresh-1"));
        assert!(storage.load().await.unwrap().is_none());

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 2).await;
        assert_eq!(server.refresh_calls(), 0);

        // 이미 로그아웃된 상태에서도 성공
        session.logout().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_all() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;

        assert!(matches!(
            session.logout_all().await.unwrap_err(),
            SessionError::NotAuthenticated
        ));

        session.login("a@x.com", "secret1").await.unwrap();
        session.logout_all().await.unwrap();
        assert!(!server.has_refresh_token("refresh-1"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_restored_from_storage() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let first = manager(&server, &storage).await;
        first.login("a@x.com", "secret1").await.unwrap();
        first.shutdown();

        let second = manager(&server, &storage).await;
        assert!(second.is_authenticated());
        let response = second.call(Method::GET, "/api/cars", None).await.unwrap();
        assert_eq!(response.body["token"], "access-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_tokens_and_refresh_without_session() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;

        assert!(matches!(
            session.refresh().await.unwrap_err(),
            SessionError::NotAuthenticated
        ));

        let tokens = StoredTokens::new("access-9", "refresh-9");
        session.set_tokens(tokens.clone()).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(storage.load().await.unwrap(), Some(tokens));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_proactive_refresh() {
        let server = FakeServer::new();
        let storage = Arc::new(MemoryTokenStorage::new());
        let session = manager(&server, &storage).await;
        session.login("a@x.com", "secret1").await.unwrap();

        session.shutdown();
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 2).await;
        assert_eq!(server.refresh_calls(), 0);
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal(401));
        assert!(is_terminal(400));
        assert!(!is_terminal(429));
        assert!(!is_terminal(503));
    }
}
