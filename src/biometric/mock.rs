//! 메모리 기반 생체 인증 게이트 (테스트/임베더용)

use super::{AuthError, AuthSession, BiometricGate, BiometryType, EnrollmentState};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 프롬프트 1회에 대한 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Accept,
    Reject(AuthError),
    /// 사용자가 응답하지 않음 (취소 테스트용)
    Hang,
}

/// 스크립트로 응답을 지정할 수 있는 게이트
///
/// 대기열에 쌓인 응답을 순서대로 소비하고, 비어 있으면 기본 응답을 사용합니다.
pub struct MockBiometricGate {
    available: AtomicBool,
    biometry: BiometryType,
    enrollment: Mutex<Option<EnrollmentState>>,
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    prompts: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBiometricGate {
    /// 항상 인증에 성공하는 Face ID 게이트
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            biometry: BiometryType::FaceId,
            enrollment: Mutex::new(Some(EnrollmentState::new(b"mock-enrollment-1".to_vec()))),
            script: Mutex::new(VecDeque::new()),
            fallback: MockOutcome::Accept,
            prompts: AtomicUsize::new(0),
        }
    }

    /// 대기열이 비었을 때의 응답 지정
    pub fn with_fallback(mut self, outcome: MockOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn with_biometry(mut self, biometry: BiometryType) -> Self {
        self.biometry = biometry;
        self
    }

    /// 다음 프롬프트 응답 추가
    pub fn push_outcome(&self, outcome: MockOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// 등록 세트 변경 (재등록 시뮬레이션)
    pub fn set_enrollment(&self, enrollment: Option<EnrollmentState>) {
        *lock(&self.enrollment) = enrollment;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 지금까지 표시된 프롬프트 수
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Default for MockBiometricGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BiometricGate for MockBiometricGate {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst) && lock(&self.enrollment).is_some()
    }

    fn biometry_type(&self) -> BiometryType {
        self.biometry
    }

    fn enrollment_state(&self) -> Option<EnrollmentState> {
        if !self.available.load(Ordering::SeqCst) {
            return None;
        }
        lock(&self.enrollment).clone()
    }

    async fn authenticate(&self, _reason: &str) -> Result<AuthSession, AuthError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(AuthError::HardwareUnavailable);
        }

        let outcome = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match outcome {
            MockOutcome::Accept => {
                let enrollment = lock(&self.enrollment).clone().ok_or(AuthError::NotEnrolled)?;
                Ok(AuthSession::new(enrollment))
            }
            MockOutcome::Reject(err) => Err(err),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let gate = MockBiometricGate::new();
        gate.push_outcome(MockOutcome::Reject(AuthError::UserCancelled));

        assert_eq!(gate.authenticate("r").await.unwrap_err(), AuthError::UserCancelled);
        assert!(gate.authenticate("r").await.is_ok());
        assert_eq!(gate.prompt_count(), 2);
    }

    #[tokio::test]
    async fn test_unenrolled_gate() {
        let gate = MockBiometricGate::new();
        gate.set_enrollment(None);

        assert!(!gate.is_available());
        assert!(gate.enrollment_state().is_none());
        assert_eq!(gate.authenticate("r").await.unwrap_err(), AuthError::NotEnrolled);
    }

    #[tokio::test]
    async fn test_session_carries_current_enrollment() {
        let gate = MockBiometricGate::new();
        let enrollment = EnrollmentState::new(b"new-face".to_vec());
        gate.set_enrollment(Some(enrollment.clone()));

        let session = gate.authenticate("r").await.unwrap();
        assert_eq!(session.enrollment(), &enrollment);
    }

    #[tokio::test]
    async fn test_hardware_unavailable() {
        let gate = MockBiometricGate::new().with_biometry(BiometryType::TouchId);
        gate.set_available(false);

        assert_eq!(gate.biometry_type(), BiometryType::TouchId);
        assert_eq!(
            gate.authenticate("r").await.unwrap_err(),
            AuthError::HardwareUnavailable
        );
    }
}
