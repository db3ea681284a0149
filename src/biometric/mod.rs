//! Biometric Gate 모듈
//!
//! 기기의 생체 인증 가능 여부를 확인하고, 1회 인증 챌린지를 수행합니다.
//!
//! - 인증 성공 시 `AuthSession`을 발급하고, 이 값은 보안 저장소 읽기에 그대로 전달됩니다.
//! - 자동 재시도는 없습니다. 재시도는 호출자가 `authenticate`를 다시 호출해야 합니다.
//! - 동시 호출은 정의되지 않으므로 호출자가 직렬화해야 합니다 (single-flight).

#[cfg(all(feature = "app", target_os = "ios"))]
pub mod ios;
pub mod keychain;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

pub use keychain::{EnrollmentTokenStore, KeychainBiometricGate};
pub use mock::{MockBiometricGate, MockOutcome};

/// 기본 인증 프롬프트 문구
pub const DEFAULT_AUTH_REASON: &str = "Authenticate using Face ID or Touch ID";

/// 세션 발급 시각이 현재보다 이만큼 미래여도 허용 (기기 간 시계 오차)
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5);

/// 생체 인증 오류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication cancelled by user")]
    UserCancelled,

    #[error("No biometrics enrolled on this device")]
    NotEnrolled,

    #[error("Biometrics locked out after too many failed attempts")]
    LockedOut,

    #[error("Biometric hardware unavailable")]
    HardwareUnavailable,

    #[error("Authentication failed: {0}")]
    Unknown(String),
}

/// 플랫폼 생체 인증 오류 코드/메시지를 게이트 오류로 변환
///
/// iOS `LAError` 이름(`userCancel`, `biometryLockout` 등)과 Android `BiometricPrompt`
/// 상수(`ERROR_USER_CANCELED`, `BIOMETRIC_ERROR_NONE_ENROLLED` 등)를 모두 받습니다.
pub fn auth_error_from_code(code: &str) -> AuthError {
    let key: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let has = |needles: &[&str]| needles.iter().any(|n| key.contains(n));

    if has(&["usercancel", "appcancel", "systemcancel", "negativebutton", "errorcanceled"]) {
        AuthError::UserCancelled
    } else if has(&["notenrolled", "noneenrolled", "nobiometrics"]) {
        AuthError::NotEnrolled
    } else if has(&["lockout"]) {
        AuthError::LockedOut
    } else if has(&["notavailable", "hwunavailable", "nohardware", "hwnotpresent"]) {
        AuthError::HardwareUnavailable
    } else {
        AuthError::Unknown(code.to_string())
    }
}

/// 기기가 지원하는 생체 인증 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BiometryType {
    None,
    TouchId,
    FaceId,
    Iris,
}

/// 현재 생체 등록 세트를 식별하는 불투명 값
///
/// 등록 세트가 바뀌면 값도 바뀝니다. 저장소는 원본 대신 SHA-256 digest만 기록합니다.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrollmentState(Vec<u8>);

impl EnrollmentState {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 저장소 접근 정책에 기록되는 digest
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.0).into()
    }
}

impl fmt::Debug for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnrollmentState({} bytes)", self.0.len())
    }
}

/// 인증 성공 증명
///
/// `Clone`을 구현하지 않으므로 저장소 읽기 1회에 소비됩니다.
#[derive(Debug)]
pub struct AuthSession {
    id: Uuid,
    enrollment: EnrollmentState,
    authenticated_at: DateTime<Utc>,
}

impl AuthSession {
    /// 방금 통과한 인증에 대한 세션 생성 (게이트 구현에서 호출)
    pub fn new(enrollment: EnrollmentState) -> Self {
        Self {
            id: Uuid::new_v4(),
            enrollment,
            authenticated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn enrollment(&self) -> &EnrollmentState {
        &self.enrollment
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }

    /// 발급 후 `max_age` 이내인지 확인
    ///
    /// 발급 시각이 `MAX_CLOCK_SKEW`보다 더 미래이면 유효하지 않은 세션으로 봅니다.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        let elapsed = Utc::now() - self.authenticated_at;
        match elapsed.to_std() {
            Ok(age) => age <= max_age,
            Err(_) => match (-elapsed).to_std() {
                Ok(ahead) => ahead <= MAX_CLOCK_SKEW,
                Err(_) => false,
            },
        }
    }

    /// 발급 시각을 `by`만큼 과거로 (음수면 미래로) 이동
    #[cfg(test)]
    pub(crate) fn backdated(mut self, by: chrono::Duration) -> Self {
        self.authenticated_at -= by;
        self
    }
}

/// 생체 인증 게이트
#[async_trait]
pub trait BiometricGate: Send + Sync {
    /// 생체 하드웨어가 있고 등록되어 사용 가능한지 (부수 효과 없음)
    fn is_available(&self) -> bool;

    /// 지원하는 생체 인증 종류 (부수 효과 없음)
    fn biometry_type(&self) -> BiometryType {
        BiometryType::None
    }

    /// 현재 등록 세트 식별자. 사용 불가하면 `None`
    fn enrollment_state(&self) -> Option<EnrollmentState>;

    /// 사용자에게 인증 프롬프트를 1회 표시하고 응답을 기다립니다.
    async fn authenticate(&self, reason: &str) -> Result<AuthSession, AuthError>;
}

/// 생체 인증을 지원하지 않는 환경용 게이트 (데스크톱 등)
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBiometricGate;

#[async_trait]
impl BiometricGate for UnavailableBiometricGate {
    fn is_available(&self) -> bool {
        false
    }

    fn enrollment_state(&self) -> Option<EnrollmentState> {
        None
    }

    async fn authenticate(&self, _reason: &str) -> Result<AuthSession, AuthError> {
        Err(AuthError::HardwareUnavailable)
    }
}
