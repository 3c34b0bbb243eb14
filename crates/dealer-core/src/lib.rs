//! # Dealer Core
//!
//! 딜러 인증 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서버(`dealer-api`)와 클라이언트(`dealer-client`)가 함께 사용하는
//! 기본 타입을 제공합니다:
//! - 딜러 엔티티와 역할
//! - Refresh Token 레코드 및 토큰 집합 규칙
//! - 시간 추상화 (`Clock`)
//! - 엔드포인트별 요청/응답 타입
//! - 설정 관리
//! - 로깅 인프라

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use wire::*;
