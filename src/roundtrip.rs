//! Secure Item Roundtrip
//!
//! Codec + Biometric Gate + Secure Store 를 조합한 저장/조회 오케스트레이터
//!
//! - 저장: encode → put (기본 정책에서는 인증 없이 쓰기)
//! - 조회: authenticate → get(session) → decode, 조회 상태 머신을 구동
//! - 조회 1회당 프롬프트 1회, 저장소 읽기 1회. 이전 세션은 재사용하지 않음

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::biometric::{AuthError, BiometricGate, DEFAULT_AUTH_REASON};
use crate::codec::{self, CodecError};
use crate::models::Recipe;
use crate::secure_store::{AccessPolicy, SecureStore, StoreError};

/// UI에 노출되는 실패 종류
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "camelCase")]
pub enum ErrorKind {
    EncodingError,
    DecodingError,
    UserCancelled,
    NotEnrolled,
    LockedOut,
    HardwareUnavailable,
    Unknown,
    NotFound,
    AccessDenied,
    PlatformError(i32),
    /// 진행 중이던 조회가 호출자에 의해 취소됨
    Cancelled,
}

impl From<&AuthError> for ErrorKind {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::UserCancelled => ErrorKind::UserCancelled,
            AuthError::NotEnrolled => ErrorKind::NotEnrolled,
            AuthError::LockedOut => ErrorKind::LockedOut,
            AuthError::HardwareUnavailable => ErrorKind::HardwareUnavailable,
            AuthError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::AccessDenied(_) => ErrorKind::AccessDenied,
            StoreError::Platform { code, .. } => ErrorKind::PlatformError(*code),
        }
    }
}

impl From<&CodecError> for ErrorKind {
    fn from(err: &CodecError) -> Self {
        match err {
            CodecError::Encoding(_) => ErrorKind::EncodingError,
            CodecError::Decoding(_) => ErrorKind::DecodingError,
        }
    }
}

/// 조회 상태
///
/// `Found`/`Failed`는 종료 상태입니다. 재시도는 새 조회 요청으로만 가능합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum RetrievalState {
    Idle,
    Authenticating,
    Found(Recipe),
    Failed(ErrorKind),
}

impl RetrievalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetrievalState::Found(_) | RetrievalState::Failed(_))
    }
}

/// 저장 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreItemError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Biometric enrollment unavailable; item cannot be protected")]
    NoEnrollment,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 조회 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Retrieval cancelled")]
    Cancelled,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Auth(e) => e.into(),
            RetrievalError::Store(e) => e.into(),
            RetrievalError::Codec(e) => e.into(),
            RetrievalError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// 쓰기 인증 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// 인증 없이 쓰기 (읽기만 인증 필요)
    #[default]
    Unauthenticated,
    /// 쓰기 전에도 프롬프트 1회
    RequireAuthentication,
}

/// 조회가 종료 상태에 도달하기 전에 future가 drop되면 `Failed(Cancelled)`로 전이
struct InFlight<'a> {
    state: &'a watch::Sender<RetrievalState>,
    armed: bool,
}

impl InFlight<'_> {
    fn finish(mut self, next: RetrievalState) {
        self.armed = false;
        self.state.send_replace(next);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::info!("retrieval dropped before completion");
            self.state
                .send_replace(RetrievalState::Failed(ErrorKind::Cancelled));
        }
    }
}

/// 보안 항목 저장/조회 오케스트레이터
pub struct SecureItemRoundtrip {
    gate: Arc<dyn BiometricGate>,
    store: Arc<dyn SecureStore>,
    state: watch::Sender<RetrievalState>,
    /// 인증 프롬프트 single-flight
    auth_flight: Mutex<()>,
    reason: String,
    write_policy: WritePolicy,
}

impl SecureItemRoundtrip {
    pub fn new(gate: Arc<dyn BiometricGate>, store: Arc<dyn SecureStore>) -> Self {
        let (state, _) = watch::channel(RetrievalState::Idle);
        Self {
            gate,
            store,
            state,
            auth_flight: Mutex::new(()),
            reason: DEFAULT_AUTH_REASON.to_string(),
            write_policy: WritePolicy::default(),
        }
    }

    /// 프롬프트 문구 지정
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    pub fn is_biometric_available(&self) -> bool {
        self.gate.is_available()
    }

    pub fn gate(&self) -> &Arc<dyn BiometricGate> {
        &self.gate
    }

    /// 현재 조회 상태 스냅샷
    pub fn state(&self) -> RetrievalState {
        self.state.borrow().clone()
    }

    /// 조회 상태 변화 구독
    pub fn subscribe(&self) -> watch::Receiver<RetrievalState> {
        self.state.subscribe()
    }

    /// 레시피 저장. 성공 시 레시피 id, 실패 시 `None`
    pub async fn store(&self, recipe: &Recipe) -> Option<String> {
        match self.try_store(recipe).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(recipe_id = %recipe.id, error = %e, "failed to store recipe securely");
                None
            }
        }
    }

    /// 레시피 저장 (실패 사유 포함)
    ///
    /// 이전에 저장된 다른 레시피는 복구할 수 없게 덮어씁니다.
    pub async fn try_store(&self, recipe: &Recipe) -> Result<String, StoreItemError> {
        let payload = zeroize::Zeroizing::new(codec::encode(recipe)?);

        let enrollment = match self.write_policy {
            WritePolicy::Unauthenticated => {
                self.gate.enrollment_state().ok_or(StoreItemError::NoEnrollment)?
            }
            WritePolicy::RequireAuthentication => {
                let _flight = self.auth_flight.lock().await;
                let session = self.gate.authenticate(&self.reason).await?;
                session.enrollment().clone()
            }
        };

        self.store
            .put(&payload, &AccessPolicy::CurrentBiometricSet(enrollment))
            .await?;

        tracing::info!(recipe_id = %recipe.id, "recipe stored securely");
        Ok(recipe.id.clone())
    }

    /// 저장된 레시피 조회. 조회 상태 머신을 구동하고, 실패 시 `None`
    pub async fn retrieve(&self) -> Option<Recipe> {
        self.try_retrieve().await.ok()
    }

    /// 저장된 레시피 조회 (실패 사유 포함)
    ///
    /// 인증이 실패하면 저장소를 읽지 않습니다.
    pub async fn try_retrieve(&self) -> Result<Recipe, RetrievalError> {
        let _flight = self.auth_flight.lock().await;

        self.state.send_replace(RetrievalState::Authenticating);
        let in_flight = InFlight {
            state: &self.state,
            armed: true,
        };

        let result = self.run_retrieval().await;

        match &result {
            Ok(recipe) => {
                tracing::info!(recipe_id = %recipe.id, "recipe retrieved");
                in_flight.finish(RetrievalState::Found(recipe.clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "recipe retrieval failed");
                in_flight.finish(RetrievalState::Failed(e.kind()));
            }
        }

        result
    }

    async fn run_retrieval(&self) -> Result<Recipe, RetrievalError> {
        let session = self.gate.authenticate(&self.reason).await?;
        let payload = self.store.get(session).await?;
        Ok(codec::decode(&payload)?)
    }
}
