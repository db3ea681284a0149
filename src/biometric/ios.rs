//! iOS 생체 인증 등록 토큰 보관소
//!
//! 상태 확인은 tauri-plugin-biometric, 토큰 보관은 Keychain(`BIOMETRY_CURRENT_SET`)이 담당합니다.
//! 보호 항목 읽기 프롬프트 문구는 OS 기본값(`NSFaceIDUsageDescription`)을 사용합니다.

use security_framework::base::Error as SecError;
use security_framework::passwords::{
    delete_generic_password, generic_password, get_generic_password, set_generic_password,
    set_generic_password_options,
};
use security_framework::passwords_options::{AccessControlOptions, PasswordOptions};
use tauri::{AppHandle, Runtime};
use tauri_plugin_biometric::{BiometricExt, Status};

use super::keychain::{auth_error_from_os_status, EnrollmentTokenStore, ERR_SEC_ITEM_NOT_FOUND};
use super::{auth_error_from_code, AuthError, BiometryType};

/// 보호 항목 계정 (현재 생체 등록 세트로만 읽힘)
const TOKEN_ACCOUNT: &str = "recipe:enrollment_token_v1";

/// 사본 계정 (프롬프트 없음)
const MARKER_ACCOUNT: &str = "recipe:enrollment_marker_v1";

pub struct IosEnrollmentTokens<R: Runtime> {
    app: AppHandle<R>,
    service: String,
}

impl<R: Runtime> IosEnrollmentTokens<R> {
    pub fn new(app: AppHandle<R>, service: impl Into<String>) -> Self {
        Self {
            app,
            service: service.into(),
        }
    }

    fn status(&self) -> Result<Status, AuthError> {
        self.app.biometric().status().map_err(|e| {
            tracing::warn!(error = %e, "biometric status probe failed");
            AuthError::HardwareUnavailable
        })
    }

    fn protected_options(&self) -> PasswordOptions {
        let mut options = PasswordOptions::new_generic_password(&self.service, TOKEN_ACCOUNT);
        options.set_access_control_options(AccessControlOptions::BIOMETRY_CURRENT_SET);
        options
    }

    fn delete(&self, account: &str) -> Result<(), AuthError> {
        match delete_generic_password(&self.service, account) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(()),
            Err(e) => Err(auth_error_from_os_status(e.code())),
        }
    }
}

fn found(result: Result<Vec<u8>, SecError>) -> Result<Option<Vec<u8>>, AuthError> {
    match result {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
        Err(e) => Err(auth_error_from_os_status(e.code())),
    }
}

impl<R: Runtime> EnrollmentTokenStore for IosEnrollmentTokens<R> {
    fn check_available(&self) -> Result<(), AuthError> {
        let status = self.status()?;
        if status.is_available {
            return Ok(());
        }
        let code = status
            .error_code
            .or(status.error)
            .unwrap_or_else(|| "biometryNotAvailable".to_string());
        Err(auth_error_from_code(&code))
    }

    fn biometry_type(&self) -> BiometryType {
        match self.status().map(|s| s.biometry_type) {
            Ok(tauri_plugin_biometric::BiometryType::TouchID) => BiometryType::TouchId,
            Ok(tauri_plugin_biometric::BiometryType::FaceID) => BiometryType::FaceId,
            Ok(tauri_plugin_biometric::BiometryType::Iris) => BiometryType::Iris,
            _ => BiometryType::None,
        }
    }

    fn load_marker(&self) -> Result<Option<Vec<u8>>, AuthError> {
        found(get_generic_password(&self.service, MARKER_ACCOUNT))
    }

    fn load_protected(&self, _reason: &str) -> Result<Option<Vec<u8>>, AuthError> {
        found(generic_password(self.protected_options()))
    }

    fn save(&self, token: &[u8]) -> Result<(), AuthError> {
        self.delete(TOKEN_ACCOUNT)?;
        set_generic_password_options(token, self.protected_options())
            .map_err(|e| auth_error_from_os_status(e.code()))?;
        set_generic_password(&self.service, MARKER_ACCOUNT, token)
            .map_err(|e| auth_error_from_os_status(e.code()))
    }
}
