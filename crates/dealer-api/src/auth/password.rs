//! 비밀번호 해싱 유틸리티.
//!
//! bcrypt 기반 비밀번호 해싱 및 검증. 해싱은 CPU를 많이 쓰므로
//! 비동기 경로에서는 [`PasswordHasher`]가 blocking 스레드에서 실행합니다.

/// bcrypt가 허용하는 최소 비용 계수 (테스트용).
pub const MIN_COST: u32 = 4;
/// bcrypt가 허용하는 최대 비용 계수.
pub const MAX_COST: u32 = 31;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패: {0}")]
    HashingFailed(String),
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
    #[error("해싱 작업 실패: {0}")]
    TaskFailed(String),
}

/// 비밀번호 해싱.
///
/// 솔트는 자동으로 생성되며 결과는 `$2b$<cost>$...` 형식입니다.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// 비밀번호 검증.
///
/// 일치하면 `Ok(true)`, 불일치하면 `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(|_| PasswordError::InvalidHashFormat)
}

/// 비용 계수를 가진 비동기 해셔.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }
}
