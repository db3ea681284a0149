//! Keychain 접근 제어 기반 생체 인증 게이트
//!
//! 등록 토큰(무작위 32 bytes)을 두 항목에 보관합니다.
//!
//! - 보호 항목: 현재 생체 등록 세트로만 읽히는 Keychain 항목. 읽을 때 OS가 프롬프트를 표시
//! - 사본: 프롬프트 없이 읽는 일반 항목. 쓰기 시점 바인딩(`enrollment_state`)에 사용
//!
//! 등록 세트가 바뀌면 OS가 보호 항목을 무효화합니다. 다음 인증에서 새 토큰이 발급되므로
//! 이전 토큰에 바인딩된 저장 항목은 `AccessDenied`로 거부됩니다.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

use super::{AuthError, AuthSession, BiometricGate, BiometryType, EnrollmentState};

/// 등록 토큰 길이
pub const ENROLLMENT_TOKEN_LEN: usize = 32;

/// errSecItemNotFound
pub const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

/// Keychain OSStatus를 게이트 오류로 변환
pub fn auth_error_from_os_status(status: i32) -> AuthError {
    match status {
        -128 => AuthError::UserCancelled,         // errSecUserCanceled
        -25291 => AuthError::HardwareUnavailable, // errSecNotAvailable
        -25308 => AuthError::HardwareUnavailable, // errSecInteractionNotAllowed
        // errSecAuthFailed
        -25293 => AuthError::Unknown("biometric authentication failed".to_string()),
        other => AuthError::Unknown(format!("Keychain error {}", other)),
    }
}

/// 등록 토큰 보관소 (플랫폼 Keychain)
///
/// 모든 메서드는 블로킹 호출입니다. `load_protected`는 생체 인증 프롬프트를 표시합니다.
pub trait EnrollmentTokenStore: Send + Sync + 'static {
    /// 생체 인증을 쓸 수 없으면 그 이유
    fn check_available(&self) -> Result<(), AuthError>;

    fn biometry_type(&self) -> BiometryType;

    /// 프롬프트 없이 사본 읽기
    fn load_marker(&self) -> Result<Option<Vec<u8>>, AuthError>;

    /// 프롬프트를 거쳐 보호 항목 읽기. 없거나 등록 세트 변경으로 무효화되었으면 `Ok(None)`
    fn load_protected(&self, reason: &str) -> Result<Option<Vec<u8>>, AuthError>;

    /// 보호 항목과 사본을 새 토큰으로 교체
    fn save(&self, token: &[u8]) -> Result<(), AuthError>;
}

pub struct KeychainBiometricGate<T> {
    tokens: Arc<T>,
}

impl<T: EnrollmentTokenStore> KeychainBiometricGate<T> {
    pub fn new(tokens: T) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }
}

fn generate_token() -> Vec<u8> {
    let mut token = vec![0u8; ENROLLMENT_TOKEN_LEN];
    rand::thread_rng().fill(token.as_mut_slice());
    token
}

/// 사본이 없으면 새 토큰을 발급하여 양쪽에 저장
fn ensure_marker<T: EnrollmentTokenStore>(tokens: &T) -> Result<Vec<u8>, AuthError> {
    if let Some(token) = tokens.load_marker()? {
        return Ok(token);
    }
    let token = generate_token();
    tokens.save(&token)?;
    tracing::info!("enrollment token issued");
    Ok(token)
}

fn authenticate_blocking<T: EnrollmentTokenStore>(
    tokens: &T,
    reason: &str,
) -> Result<EnrollmentState, AuthError> {
    ensure_marker(tokens)?;

    if let Some(token) = tokens.load_protected(reason)? {
        return Ok(EnrollmentState::new(token));
    }

    // 보호 항목 무효화 = 등록 세트 변경
    tracing::warn!("biometric enrollment changed; rotating enrollment token");
    tokens.save(&generate_token())?;
    match tokens.load_protected(reason)? {
        Some(token) => Ok(EnrollmentState::new(token)),
        None => Err(AuthError::Unknown(
            "enrollment token unavailable after rotation".to_string(),
        )),
    }
}

#[async_trait]
impl<T: EnrollmentTokenStore> BiometricGate for KeychainBiometricGate<T> {
    fn is_available(&self) -> bool {
        self.tokens.check_available().is_ok()
    }

    fn biometry_type(&self) -> BiometryType {
        self.tokens.biometry_type()
    }

    fn enrollment_state(&self) -> Option<EnrollmentState> {
        self.tokens.check_available().ok()?;
        match ensure_marker(self.tokens.as_ref()) {
            Ok(token) => Some(EnrollmentState::new(token)),
            Err(e) => {
                tracing::warn!(error = %e, "enrollment token unavailable");
                None
            }
        }
    }

    async fn authenticate(&self, reason: &str) -> Result<AuthSession, AuthError> {
        self.tokens.check_available()?;

        let tokens = Arc::clone(&self.tokens);
        let reason = reason.to_string();
        let enrollment =
            tokio::task::spawn_blocking(move || authenticate_blocking(tokens.as_ref(), &reason))
                .await
                .map_err(|e| AuthError::Unknown(e.to_string()))??;

        Ok(AuthSession::new(enrollment))
    }
}
