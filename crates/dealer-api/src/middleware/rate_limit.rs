//! Rate limiting middleware.
//!
//! 클라이언트 IP별 고정 윈도우 방식으로 요청 수를 제한합니다.
//! 기본값은 15분에 100회입니다.
//!
//! 클라이언트 IP는 연결 주소입니다. 연결 주소가 `trusted_proxies`에 있을 때만
//! 전달 헤더(`X-Forwarded-For`, `X-Real-IP`)를 사용합니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dealer_core::{ErrorBody, ErrorCode, RateLimitSettings};
use metrics::counter;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const LIMITED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Rate Limiter 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이
    pub window: Duration,
    /// 전달 헤더를 믿을 프록시
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            trusted_proxies: Vec::new(),
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests.max(1),
            window: Duration::from_secs(settings.window_secs.max(1)),
            trusted_proxies: settings.trusted_proxies.clone(),
        }
    }
}

/// IP 하나의 현재 윈도우.
#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Rate Limit 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited {
        /// 재시도까지 대기 시간 (초)
        retry_after: u64,
    },
}

/// IP별 Rate Limiter.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 요청 허용 여부 확인.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let window = windows.entry(ip).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(window.started_at) >= self.config.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            RateLimitResult::Allowed
        } else {
            let reset_in = self
                .config
                .window
                .saturating_sub(now.duration_since(window.started_at));
            RateLimitResult::Limited {
                retry_after: reset_in.as_secs().max(1),
            }
        }
    }

    /// 만료된 윈도우 정리.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started_at) < window);
    }

    pub async fn tracked_ips(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// 윈도우 길이마다 `cleanup`을 실행하는 백그라운드 태스크 시작.
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.config.window);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        })
    }
}

/// Rate Limiting 미들웨어.
///
/// `axum::middleware::from_fn_with_state(limiter, rate_limit_middleware)`로 연결합니다.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, &limiter.config.trusted_proxies);

    match limiter.check(ip).await {
        RateLimitResult::Allowed => {
            counter!("rate_limit_requests_total", "status" => "allowed").increment(1);
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            counter!("rate_limit_requests_total", "status" => "limited").increment(1);
            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");

            let body = ErrorBody::new("Too Many Requests", LIMITED_MESSAGE)
                .with_code(ErrorCode::RateLimited);
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

/// 요청에서 클라이언트 IP 추출.
///
/// 연결 주소가 없으면 (테스트 등) localhost로 취급합니다.
fn extract_client_ip(request: &Request, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    if !trusted_proxies.contains(&peer) {
        return peer;
    }

    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .unwrap_or(peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            trusted_proxies: Vec::new(),
        })
    }

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_limit() {
        let limiter = limiter(3, 60);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for _ in 0..3 {
            assert_eq!(limiter.check(ip).await, RateLimitResult::Allowed);
        }
        assert_eq!(
            limiter.check(ip).await,
            RateLimitResult::Limited { retry_after: 60 }
        );

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(
            limiter.check(ip).await,
            RateLimitResult::Limited { retry_after: 15 }
        );

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(limiter.check(ip).await, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_different_ips_are_independent() {
        let limiter = limiter(1, 60);
        let ip1: IpAddr = "192.168.1.1".parse().unwrap();
        let ip2: IpAddr = "192.168.1.2".parse().unwrap();

        assert_eq!(limiter.check(ip1).await, RateLimitResult::Allowed);
        assert!(matches!(limiter.check(ip1).await, RateLimitResult::Limited { .. }));
        assert_eq!(limiter.check(ip2).await, RateLimitResult::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_runs_every_window() {
        let limiter = limiter(5, 10);
        let task = limiter.spawn_cleanup();
        let _ = limiter.check("10.0.0.2".parse().unwrap()).await;

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(limiter.tracked_ips().await, 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired_windows() {
        let limiter = limiter(5, 10);
        let _ = limiter.check("10.0.0.1".parse().unwrap()).await;
        assert_eq!(limiter.tracked_ips().await, 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_ips().await, 0);
    }

    #[test]
    fn test_config_from_settings() {
        let config = RateLimitConfig::from(&RateLimitSettings::default());
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_secs(900));
        assert!(config.trusted_proxies.is_empty());
    }

    #[test]
    fn test_forwarded_headers_ignored_from_untrusted_peer() {
        let request = request_from("198.51.100.9:4000", Some("203.0.113.7"));
        assert_eq!(
            extract_client_ip(&request, &[]),
            "198.51.100.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_forwarded_headers_used_from_trusted_proxy() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();

        let request = request_from("10.0.0.1:4000", Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(
            extract_client_ip(&request, &[proxy]),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );

        let mut request = request_from("10.0.0.1:4000", None);
        request
            .headers_mut()
            .insert("x-real-ip", HeaderValue::from_static("203.0.113.8"));
        assert_eq!(
            extract_client_ip(&request, &[proxy]),
            "203.0.113.8".parse::<IpAddr>().unwrap()
        );

        // 헤더가 없거나 깨졌으면 프록시 주소 자체
        let request = request_from("10.0.0.1:4000", Some("not-an-ip"));
        assert_eq!(extract_client_ip(&request, &[proxy]), proxy);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_bypass_limit() {
        let app = Router::new()
            .route("/", get(|| async { "OK" }))
            .layer(middleware::from_fn_with_state(limiter(1, 900), rate_limit_middleware));

        let first = app
            .clone()
            .oneshot(request_from("198.51.100.9:4000", Some("203.0.113.1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(request_from("198.51.100.9:4001", Some("203.0.113.2")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let app = Router::new()
            .route("/", get(|| async { "OK" }))
            .layer(middleware::from_fn_with_state(limiter(1, 900), rate_limit_middleware));

        let request = || {
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(RETRY_AFTER));

        let bytes = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, Some(ErrorCode::RateLimited));
        assert_eq!(body.message, LIMITED_MESSAGE);
    }
}
