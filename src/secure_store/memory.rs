//! 메모리 기반 보안 저장소 (테스트/임베더용)

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use super::{verify_session, AccessPolicy, SecureStore, StoreError, DEFAULT_SESSION_MAX_AGE};
use crate::biometric::AuthSession;

struct StoredItem {
    digest: [u8; 32],
    payload: Zeroizing<Vec<u8>>,
}

/// 단일 슬롯 메모리 저장소
///
/// 쓰기/읽기 횟수를 기록하고, 쓰기 실패를 주입할 수 있습니다.
pub struct MemorySecureStore {
    slot: Mutex<Option<StoredItem>>,
    session_max_age: Duration,
    fail_writes: AtomicBool,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            fail_writes: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn with_session_max_age(mut self, max_age: Duration) -> Self {
        self.session_max_age = max_age;
        self
    }

    /// 이후 쓰기를 플랫폼 오류로 실패시킴
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// 인증 없이 항목 존재 여부 확인
    pub async fn contains_item(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl Default for MemorySecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn put(&self, payload: &[u8], policy: &AccessPolicy) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        self.puts.fetch_add(1, Ordering::SeqCst);

        // 삭제 후 삽입
        *slot = None;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::platform(super::codes::IO_UNKNOWN, "injected write failure"));
        }

        *slot = Some(StoredItem {
            digest: policy.digest(),
            payload: Zeroizing::new(payload.to_vec()),
        });
        Ok(())
    }

    async fn get(&self, session: AuthSession) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let slot = self.slot.lock().await;
        self.gets.fetch_add(1, Ordering::SeqCst);

        let item = slot.as_ref().ok_or(StoreError::NotFound)?;
        verify_session(&session, &item.digest, self.session_max_age)?;
        Ok(item.payload.clone())
    }
}
