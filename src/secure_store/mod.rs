//! Secure Store 모듈
//!
//! 고정된 논리 키("RecipeItem") 아래에 바이트 페이로드 1개만 보관합니다.
//!
//! - 쓰기: 기존 항목 삭제 후 삽입 (이전 페이로드는 복구 불가)
//! - 읽기: 생체 인증 세션(`AuthSession`)이 필요하며, 세션은 1회 읽기에 소비됨
//! - 쓰기 시점의 생체 등록 세트에 바인딩되어, 등록 세트가 바뀌면 읽기가 거부됨

pub mod memory;
pub mod vault;

use async_trait::async_trait;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::biometric::{AuthSession, EnrollmentState};

pub use memory::MemorySecureStore;
pub use vault::{MasterKey, MasterKeySource, VaultSecureStore};

/// 저장 항목의 고정 논리 키
pub const ITEM_ACCOUNT: &str = "RecipeItem";

/// 세션 기본 유효 시간
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30);

/// 플랫폼 오류 코드 (I/O 오류는 OS 코드를 그대로 사용)
pub mod codes {
    pub const IO_UNKNOWN: i32 = -1;
    pub const KEYCHAIN: i32 = -2;
    pub const FORMAT: i32 = -3;
    pub const DECRYPT: i32 = -4;
    pub const ENCRYPT: i32 = -5;
}

/// 저장소 오류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("No item stored")]
    NotFound,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Platform error {code}: {message}")]
    Platform { code: i32, message: String },
}

impl StoreError {
    pub fn platform(code: i32, message: impl Into<String>) -> Self {
        StoreError::Platform {
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::platform(err.raw_os_error().unwrap_or(codes::IO_UNKNOWN), err.to_string())
    }
}

/// 저장 항목 접근 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// 쓰기 시점의 생체 등록 세트로만 읽기 허용
    CurrentBiometricSet(EnrollmentState),
}

impl AccessPolicy {
    pub(crate) fn digest(&self) -> [u8; 32] {
        match self {
            AccessPolicy::CurrentBiometricSet(enrollment) => enrollment.digest(),
        }
    }
}

/// 단일 슬롯 보안 저장소
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// 기존 항목을 삭제하고 새 페이로드를 저장
    async fn put(&self, payload: &[u8], policy: &AccessPolicy) -> Result<(), StoreError>;

    /// 인증 세션을 소비하여 저장된 페이로드 반환
    async fn get(&self, session: AuthSession) -> Result<Zeroizing<Vec<u8>>, StoreError>;
}

/// 세션이 저장 항목의 접근 정책을 만족하는지 확인
pub(crate) fn verify_session(
    session: &AuthSession,
    stored_digest: &[u8; 32],
    max_age: Duration,
) -> Result<(), StoreError> {
    if !session.is_fresh(max_age) {
        return Err(StoreError::AccessDenied(
            "authentication session expired".to_string(),
        ));
    }
    if &session.enrollment().digest() != stored_digest {
        return Err(StoreError::AccessDenied(
            "biometric enrollment changed".to_string(),
        ));
    }
    Ok(())
}
