//! HTTP 요청 metrics middleware.
//!
//! `path` 라벨은 라우터에 등록된 경로 템플릿(`/api/admin/dealers/{id}/status`)입니다.
//! 어떤 라우트에도 맞지 않는 요청은 모두 [`UNMATCHED_ROUTE`] 하나로 묶어
//! 임의 경로 요청이 라벨 개수를 늘리지 못하게 합니다.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_duration, record_http_request, record_http_response};

/// 라우트가 없는 요청의 `path` 라벨.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// 요청의 `path` 라벨.
pub fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// 각 요청에 대해 다음 메트릭을 기록합니다:
/// - `http_requests_total`: 총 요청 수 (method, path 라벨)
/// - `http_responses_total`: 총 응답 수 (method, path, status 라벨)
/// - `http_request_duration_seconds`: 요청 처리 시간 히스토그램
///
/// 라우트 매칭 이후에 실행되도록 `Router::layer`로 붙입니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = route_label(&request);

    record_http_request(&method, &route);
    let response = next.run(request).await;

    record_http_response(&method, &route, response.status().as_u16());
    record_http_duration(&method, &route, start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, Method, StatusCode},
        middleware,
        routing::{get, put},
        Router,
    };
    use tower::ServiceExt;

    const LABEL_HEADER: &str = "x-route-label";

    /// 계산된 라벨을 응답 헤더로 돌려줍니다.
    async fn echo_label(request: Request, next: Next) -> Response {
        let label = route_label(&request);
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&label) {
            response.headers_mut().insert(LABEL_HEADER, value);
        }
        response
    }

    fn app() -> Router {
        let admin = Router::new().route("/dealers/{id}/status", put(|| async { "OK" }));
        Router::new()
            .route("/api/health", get(|| async { "OK" }))
            .nest("/api/admin", admin)
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(echo_label))
    }

    async fn label_for(method: Method, uri: &str) -> (StatusCode, String) {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let label = response
            .headers()
            .get(LABEL_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (response.status(), label)
    }

    #[tokio::test]
    async fn test_label_is_route_template() {
        let (status, label) = label_for(
            Method::PUT,
            "/api/admin/dealers/123e4567-e89b-12d3-a456-426614174000/status",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(label, "/api/admin/dealers/{id}/status");

        let (_, label) = label_for(Method::GET, "/api/health").await;
        assert_eq!(label, "/api/health");
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_label() {
        let (status, first) = label_for(Method::GET, "/wp-admin/setup.php").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, second) = label_for(Method::GET, "/random/a8f3c2/xyz").await;

        assert_eq!(first, UNMATCHED_ROUTE);
        assert_eq!(second, UNMATCHED_ROUTE);
    }

    #[tokio::test]
    async fn test_metrics_middleware_passes_through() {
        let app = Router::new()
            .route("/api/admin/dealers/{id}/status", put(|| async { "OK" }))
            .layer(middleware::from_fn(metrics_layer));

        let request = axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/api/admin/dealers/123e4567-e89b-12d3-a456-426614174000/status")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
