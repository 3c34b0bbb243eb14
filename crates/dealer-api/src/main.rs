//! 딜러 인증 API 서버.
//!
//! 설정을 읽고 자격증명 저장소를 준비한 뒤 Axum 서버를 시작합니다.
//! `database.url`이 없으면 메모리 저장소로 동작합니다 (재시작 시 데이터 유실).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, Method, StatusCode},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use dealer_api::auth::PasswordHasher;
use dealer_api::services::ensure_admin;
use dealer_api::store::{DealerStore, InMemoryDealerStore, PgDealerStore};
use dealer_api::{create_router, setup_metrics_recorder, AppState};
use dealer_core::{init_logging, AppConfig, Clock, CorsConfig, LogConfig, SystemClock};

/// CORS 레이어 생성.
///
/// 허용 origin이 비어 있으면 모든 origin을 허용합니다 (개발용).
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .allowed_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        warn!("cors.allowed_origins not set, allowing any origin (development mode)");
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 설정에 따라 자격증명 저장소를 준비합니다.
async fn create_store(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(Arc<dyn DealerStore>, Option<sqlx::PgPool>)> {
    let policy = config.auth.refresh_policy();

    match config.database.url.as_deref() {
        Some(url) => {
            let pool = PgDealerStore::connect(
                url,
                config.database.max_connections,
                Duration::from_secs(config.database.connection_timeout_secs),
            )
            .await
            .context("데이터베이스 연결 실패")?;

            let store = PgDealerStore::new(pool.clone(), clock, policy);
            store.migrate().await.context("마이그레이션 실패")?;

            let store: Arc<dyn DealerStore> = Arc::new(store);
            Ok((store, Some(pool)))
        }
        None => {
            warn!("database.url not set, using in-memory credential store (data is lost on restart)");
            let store: Arc<dyn DealerStore> = Arc::new(InMemoryDealerStore::new(clock, policy));
            Ok((store, None))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;
    init_logging(LogConfig::from(&config.logging)).context("로깅 초기화 실패")?;

    info!("Starting Dealer API server...");

    let metrics_handle = setup_metrics_recorder().context("Prometheus 레코더 설치 실패")?;
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "소켓 주소가 유효하지 않습니다: {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (store, db_pool) = create_store(&config, clock.clone()).await?;

    if ensure_admin(
        store.as_ref(),
        &PasswordHasher::new(config.auth.bcrypt_cost),
        &config.seed,
    )
    .await
    .context("관리자 계정 생성 실패")?
    {
        info!("Seed admin account created");
    }

    let request_timeout = config.server.request_timeout();
    let cors = cors_layer(&config.cors);

    let mut state = AppState::new(config, store, clock).context("애플리케이션 상태 생성 실패")?;
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        has_db = state.db_pool.is_some(),
        environment = ?state.config.server.environment,
        "Application state initialized"
    );

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = Router::new()
        .merge(metrics_router)
        .merge(create_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(cors);

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기 (Ctrl+C 또는 SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
