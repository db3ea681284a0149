//! Vault 파일 기반 보안 저장소
//!
//! 파일 포맷 (v1):
//! - magic: `RCPITEM1` (8 bytes)
//! - enrollment digest: 32 bytes (쓰기 시점 생체 등록 세트의 SHA-256)
//! - nonce: 24 bytes (XChaCha20-Poly1305)
//! - ciphertext: AEAD 결과 (= 암호문 + 태그)
//!
//! AAD: magic + enrollment digest (포맷 및 접근 정책 바인딩)
//!
//! 마스터키는 Keychain에 1개만 저장하고, 처음 쓰기 시 생성합니다.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use keyring::Entry;
use rand::Rng;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{
    codes, verify_session, AccessPolicy, SecureStore, StoreError, DEFAULT_SESSION_MAX_AGE,
    ITEM_ACCOUNT,
};
use crate::biometric::AuthSession;

/// 파일 매직 (8 bytes)
pub const VAULT_MAGIC: &[u8; 8] = b"RCPITEM1";

/// 마스터키 길이 (256-bit)
pub const MASTER_KEY_LEN: usize = 32;

/// Nonce 길이 (XChaCha20-Poly1305용 24 bytes)
pub const NONCE_LEN: usize = 24;

const DIGEST_LEN: usize = 32;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = VAULT_MAGIC.len() + DIGEST_LEN + NONCE_LEN;

/// Keychain에 저장되는 마스터키 계정 이름
pub const MASTER_KEY_ACCOUNT: &str = "recipe:master_key_v1";

/// Zeroize가 적용된 마스터키 래퍼
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// 마스터키 생성 (CSPRNG)
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASTER_KEY_LEN];
        rand::thread_rng().fill(&mut bytes);
        Self { bytes }
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// 마스터키 출처
#[derive(Debug, Clone)]
pub enum MasterKeySource {
    /// OS Keychain/키링 (없으면 첫 쓰기 시 생성)
    Keychain { service: String, account: String },
    /// 고정 키 (테스트/임베더용)
    Fixed(MasterKey),
}

impl MasterKeySource {
    pub fn keychain(service: impl Into<String>) -> Self {
        MasterKeySource::Keychain {
            service: service.into(),
            account: MASTER_KEY_ACCOUNT.to_string(),
        }
    }
}

/// app_data_dir 기반 vault 경로 생성
pub fn get_vault_path(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join("recipe_item.vault")
}

/// Vault 파일이 존재하는지 확인
pub fn vault_exists(path: &Path) -> bool {
    path.exists()
}

fn aad(digest: &[u8; DIGEST_LEN]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(VAULT_MAGIC.len() + DIGEST_LEN);
    aad.extend_from_slice(VAULT_MAGIC);
    aad.extend_from_slice(digest);
    aad
}

/// 페이로드를 암호화하여 vault 파일에 저장 (기존 파일 삭제 후 삽입)
fn encrypt_and_write(
    path: &Path,
    master_key: &MasterKey,
    digest: &[u8; DIGEST_LEN],
    plaintext: &[u8],
) -> Result<(), StoreError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let cipher = XChaCha20Poly1305::new((&master_key.bytes).into());
    let aad = aad(digest);
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| StoreError::platform(codes::ENCRYPT, e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    write_via_temp(path, &[VAULT_MAGIC, digest, &nonce, &ciphertext])
}

/// 실패 경로에서 남은 임시 파일 삭제
struct TempFileGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl Drop for TempFileGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to remove temp vault file"
                    );
                }
            }
        }
    }
}

/// Atomic write: 임시 파일에 쓰고 rename
fn write_via_temp(path: &Path, parts: &[&[u8]]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("vault.tmp");
    let mut guard = TempFileGuard {
        path: &tmp_path,
        armed: true,
    };

    let mut file = fs::File::create(&tmp_path)?;
    for part in parts {
        file.write_all(part)?;
    }
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    guard.armed = false;

    Ok(())
}

/// Vault 파일 헤더
struct VaultFile {
    digest: [u8; DIGEST_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

fn read_vault_file(path: &Path) -> Result<VaultFile, StoreError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::NotFound),
        Err(e) => return Err(e.into()),
    };

    if raw.len() < HEADER_LEN + TAG_LEN {
        return Err(StoreError::platform(codes::FORMAT, "vault file truncated"));
    }
    if &raw[..VAULT_MAGIC.len()] != VAULT_MAGIC {
        return Err(StoreError::platform(codes::FORMAT, "invalid vault magic"));
    }

    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&raw[VAULT_MAGIC.len()..VAULT_MAGIC.len() + DIGEST_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&raw[VAULT_MAGIC.len() + DIGEST_LEN..HEADER_LEN]);

    Ok(VaultFile {
        digest,
        nonce,
        ciphertext: raw[HEADER_LEN..].to_vec(),
    })
}

fn decrypt(master_key: &MasterKey, file: &VaultFile) -> Result<Zeroizing<Vec<u8>>, StoreError> {
    let cipher = XChaCha20Poly1305::new((&master_key.bytes).into());
    let aad = aad(&file.digest);
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(&file.nonce),
            Payload {
                msg: &file.ciphertext,
                aad: &aad,
            },
        )
        .map_err(|e| StoreError::platform(codes::DECRYPT, format!("Decryption failed: {}", e)))?;
    Ok(Zeroizing::new(plaintext))
}

fn map_keyring_error(err: keyring::Error) -> StoreError {
    match err {
        keyring::Error::NoStorageAccess(e) => {
            StoreError::AccessDenied(format!("Keychain access refused: {}", e))
        }
        other => StoreError::platform(codes::KEYCHAIN, format!("Keychain error: {}", other)),
    }
}

/// 영속 백엔드의 Keychain 항목 생성
///
/// keyring은 플랫폼 백엔드가 없으면(Android 등) mock 저장소를 고르는데, mock은 `Entry`
/// 인스턴스나 프로세스를 넘어 값을 보존하지 않습니다. 재시작 후 읽을 수 없는 마스터키로
/// 항목을 쓰지 않도록 여기서 거부합니다.
fn keychain_entry(service: &str, account: &str) -> Result<Entry, StoreError> {
    let entry = Entry::new(service, account).map_err(map_keyring_error)?;
    if entry
        .get_credential()
        .downcast_ref::<keyring::mock::MockCredential>()
        .is_some()
    {
        return Err(StoreError::platform(
            codes::KEYCHAIN,
            "No persistent keychain backend on this platform",
        ));
    }
    Ok(entry)
}

/// Keychain에서 마스터키 로드 (없으면 `None`)
fn load_master_key_from_keychain(
    service: &str,
    account: &str,
) -> Result<Option<MasterKey>, StoreError> {
    let entry = keychain_entry(service, account)?;

    let encoded = match entry.get_password() {
        Ok(password) => Zeroizing::new(password),
        Err(keyring::Error::NoEntry) => return Ok(None),
        Err(e) => return Err(map_keyring_error(e)),
    };

    // Base64 디코딩
    let bytes = Zeroizing::new(
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|_| StoreError::platform(codes::KEYCHAIN, "Invalid master key format"))?,
    );

    if bytes.len() != MASTER_KEY_LEN {
        return Err(StoreError::platform(codes::KEYCHAIN, "Invalid master key format"));
    }

    let mut key = [0u8; MASTER_KEY_LEN];
    key.copy_from_slice(&bytes);
    let master_key = MasterKey::from_bytes(key);
    key.zeroize();

    Ok(Some(master_key))
}

/// Keychain에 마스터키 저장
fn save_master_key_to_keychain(
    service: &str,
    account: &str,
    key: &MasterKey,
) -> Result<(), StoreError> {
    let entry = keychain_entry(service, account)?;
    let encoded = Zeroizing::new(BASE64.encode(key.bytes));
    entry.set_password(&encoded).map_err(map_keyring_error)
}

/// 단일 항목 vault 저장소
///
/// 모든 put/get은 하나의 async mutex로 직렬화되며, mutex 안에 마스터키 캐시를 보관합니다.
pub struct VaultSecureStore {
    path: PathBuf,
    key_source: MasterKeySource,
    cached_key: Mutex<Option<MasterKey>>,
    session_max_age: Duration,
}

impl VaultSecureStore {
    pub fn new(app_data_dir: &Path, key_source: MasterKeySource) -> Self {
        Self {
            path: get_vault_path(app_data_dir),
            key_source,
            cached_key: Mutex::new(None),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
        }
    }

    pub fn with_session_max_age(mut self, max_age: Duration) -> Self {
        self.session_max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 인증 없이 항목 존재 여부 확인
    pub fn has_item(&self) -> bool {
        vault_exists(&self.path)
    }

    /// 마스터키 확보. `create`가 true면 Keychain에 없을 때 새로 생성
    fn resolve_key(
        &self,
        cached: &mut Option<MasterKey>,
        create: bool,
    ) -> Result<MasterKey, StoreError> {
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = match &self.key_source {
            MasterKeySource::Fixed(key) => key.clone(),
            MasterKeySource::Keychain { service, account } => {
                match load_master_key_from_keychain(service, account)? {
                    Some(key) => {
                        tracing::debug!(service = %service, "master key loaded from keychain");
                        key
                    }
                    None if create => {
                        let key = MasterKey::generate();
                        save_master_key_to_keychain(service, account, &key)?;
                        tracing::info!(service = %service, "new master key saved to keychain");
                        key
                    }
                    None => {
                        return Err(StoreError::platform(
                            codes::KEYCHAIN,
                            "Keychain entry not found",
                        ))
                    }
                }
            }
        };

        *cached = Some(key.clone());
        Ok(key)
    }
}

#[async_trait]
impl SecureStore for VaultSecureStore {
    async fn put(&self, payload: &[u8], policy: &AccessPolicy) -> Result<(), StoreError> {
        let mut cached = self.cached_key.lock().await;
        let key = self.resolve_key(&mut cached, true)?;

        encrypt_and_write(&self.path, &key, &policy.digest(), payload)?;

        tracing::debug!(account = ITEM_ACCOUNT, bytes = payload.len(), "vault item written");
        Ok(())
    }

    async fn get(&self, session: AuthSession) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let mut cached = self.cached_key.lock().await;

        let file = read_vault_file(&self.path)?;
        verify_session(&session, &file.digest, self.session_max_age)?;

        let key = self.resolve_key(&mut cached, false)?;
        let plaintext = decrypt(&key, &file)?;

        tracing::debug!(
            account = ITEM_ACCOUNT,
            session = %session.id(),
            bytes = plaintext.len(),
            "vault item read"
        );
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::EnrollmentState;
    use tempfile::tempdir;

    fn fixed_key() -> MasterKeySource {
        MasterKeySource::Fixed(MasterKey::generate())
    }

    fn policy(tag: &[u8]) -> AccessPolicy {
        AccessPolicy::CurrentBiometricSet(EnrollmentState::new(tag.to_vec()))
    }

    fn session(tag: &[u8]) -> AuthSession {
        AuthSession::new(EnrollmentState::new(tag.to_vec()))
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());

        store.put(b"{\"id\":\"abc123\"}", &policy(b"face")).await.unwrap();
        assert!(store.has_item());

        let payload = store.get(session(b"face")).await.unwrap();
        assert_eq!(payload.as_slice(), b"{\"id\":\"abc123\"}");
    }

    #[tokio::test]
    async fn test_get_without_item_is_not_found() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());

        assert_eq!(store.get(session(b"face")).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_item() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());

        store.put(b"first", &policy(b"face")).await.unwrap();
        store.put(b"second", &policy(b"face")).await.unwrap();

        let payload = store.get(session(b"face")).await.unwrap();
        assert_eq!(payload.as_slice(), b"second");
        assert!(!store.path().with_extension("vault.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_layout_hides_plaintext() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());
        let enrollment = EnrollmentState::new(b"face".to_vec());

        store
            .put(b"very secret soup", &AccessPolicy::CurrentBiometricSet(enrollment.clone()))
            .await
            .unwrap();

        let raw = fs::read(store.path()).unwrap();
        assert_eq!(&raw[..8], VAULT_MAGIC);
        assert_eq!(&raw[8..40], &enrollment.digest());
        assert_eq!(raw.len(), HEADER_LEN + b"very secret soup".len() + TAG_LEN);
        assert!(!raw.windows(6).any(|w| w == b"secret"));
    }

    #[tokio::test]
    async fn test_changed_enrollment_is_denied() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());

        store.put(b"payload", &policy(b"face-old")).await.unwrap();
        let result = store.get(session(b"face-new")).await;

        assert!(matches!(result, Err(StoreError::AccessDenied(_))));
        assert!(store.has_item());
    }

    #[tokio::test]
    async fn test_wrong_master_key_fails_with_decrypt_code() {
        let dir = tempdir().unwrap();
        let writer = VaultSecureStore::new(dir.path(), fixed_key());
        writer.put(b"payload", &policy(b"face")).await.unwrap();

        // 다른 키로 복호화 시도하면 실패해야 함
        let reader = VaultSecureStore::new(dir.path(), fixed_key());
        match reader.get(session(b"face")).await {
            Err(StoreError::Platform { code, .. }) => assert_eq!(code, codes::DECRYPT),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tampered_magic_is_format_error() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());
        store.put(b"payload", &policy(b"face")).await.unwrap();

        let mut raw = fs::read(store.path()).unwrap();
        raw[0] = b'X';
        fs::write(store.path(), &raw).unwrap();

        match store.get(session(b"face")).await {
            Err(StoreError::Platform { code, .. }) => assert_eq!(code, codes::FORMAT),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_is_decrypt_error() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());
        store.put(b"payload", &policy(b"face")).await.unwrap();

        let mut raw = fs::read(store.path()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        fs::write(store.path(), &raw).unwrap();

        match store.get(session(b"face")).await {
            Err(StoreError::Platform { code, .. }) => assert_eq!(code, codes::DECRYPT),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_file_is_format_error() {
        let dir = tempdir().unwrap();
        let store = VaultSecureStore::new(dir.path(), fixed_key());
        fs::write(store.path(), b"RCPITEM1short").unwrap();

        match store.get(session(b"face")).await {
            Err(StoreError::Platform { code, .. }) => assert_eq!(code, codes::FORMAT),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_denied() {
        let dir = tempdir().unwrap();
        let store =
            VaultSecureStore::new(dir.path(), fixed_key()).with_session_max_age(Duration::from_secs(5));
        store.put(b"payload", &policy(b"face")).await.unwrap();

        let stale = session(b"face").backdated(chrono::Duration::seconds(10));
        assert!(matches!(store.get(stale).await, Err(StoreError::AccessDenied(_))));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        // 비어 있지 않은 디렉터리로는 rename 불가
        let target = dir.path().join("occupied");
        fs::create_dir_all(target.join("child")).unwrap();

        let result = write_via_temp(&target, &[VAULT_MAGIC, b"payload"]);
        assert!(matches!(result, Err(StoreError::Platform { .. })));
        assert!(!target.with_extension("vault.tmp").exists());
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_non_persistent_keychain_is_refused_across_restart() {
        // Android처럼 플랫폼 백엔드가 없을 때 keyring이 고르는 mock 저장소
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());

        let dir = tempdir().unwrap();
        let service = "com.recipeapp.test.non-persistent";

        let first = VaultSecureStore::new(dir.path(), MasterKeySource::keychain(service));
        match first.put(b"payload", &policy(b"face")).await {
            Err(StoreError::Platform { code, message }) => {
                assert_eq!(code, codes::KEYCHAIN);
                assert!(message.contains("persistent"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!first.has_item());
        drop(first);

        // 재시작: 새 인스턴스는 읽을 수 없는 항목 대신 빈 슬롯을 봅니다
        let second = VaultSecureStore::new(dir.path(), MasterKeySource::keychain(service));
        assert_eq!(second.get(session(b"face")).await.unwrap_err(), StoreError::NotFound);
    }
}
