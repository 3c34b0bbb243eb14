//! # Dealer Client
//!
//! 딜러 인증 API용 클라이언트 세션 관리자.
//!
//! - [`session`]: 토큰 보관, 만료 시 단일 갱신 및 재전송, 선제 갱신 타이머
//! - [`storage`]: 토큰 저장소 (메모리 / JSON 파일)
//! - [`transport`]: HTTP 전송 계층 (reqwest)
//!
//! # 사용 예
//!
//! ```no_run
//! use std::sync::Arc;
//! use dealer_client::{FileTokenStorage, HttpTransport, SessionConfig, SessionManager};
//!
//! # async fn run() -> Result<(), dealer_client::SessionError> {
//! let transport = Arc::new(HttpTransport::with_default_timeout("http://localhost:5000")?);
//! let storage = Arc::new(FileTokenStorage::new("session.json"));
//! let session = SessionManager::new(transport, storage, SessionConfig::default()).await?;
//!
//! session.login("a@x.com", "secret1").await?;
//! let profile = session
//!     .call(reqwest::Method::GET, "/api/auth/profile", None)
//!     .await?;
//! println!("{}", profile.body);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod session;
pub mod storage;
pub mod transport;

pub use error::{SessionError, SessionResult};
pub use session::{SessionConfig, SessionManager, SessionState, DEFAULT_REFRESH_INTERVAL};
pub use storage::{FileTokenStorage, MemoryTokenStorage, StoredTokens, TokenStorage};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, DEFAULT_TIMEOUT};

pub use reqwest::Method;
