//! App State
//!
//! 프로세스당 1개씩 만드는 공급자/저장소/게이트를 묶어 명령 계층에 전달합니다.

use std::path::Path;
use std::sync::Arc;

use crate::biometric::BiometricGate;
use crate::catalog::RecipeCatalog;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::provider::{RecipeListProvider, WebProvider};
use crate::roundtrip::SecureItemRoundtrip;
use crate::secure_store::{MasterKeySource, SecureStore, VaultSecureStore};

/// 명령 계층이 공유하는 상태
pub struct AppState {
    pub catalog: RecipeCatalog,
    pub roundtrip: SecureItemRoundtrip,
}

impl AppState {
    /// 이미 만들어진 구성 요소로 상태 생성
    pub fn new(
        provider: Arc<dyn RecipeListProvider>,
        gate: Arc<dyn BiometricGate>,
        store: Arc<dyn SecureStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            catalog: RecipeCatalog::new(provider),
            roundtrip: SecureItemRoundtrip::new(gate, store).with_reason(config.auth_reason.clone()),
        }
    }

    /// 설정에 따라 HTTP 공급자 + Keychain 기반 vault 저장소로 상태 생성
    pub fn from_config(
        config: &AppConfig,
        app_data_dir: &Path,
        gate: Arc<dyn BiometricGate>,
    ) -> Result<Self, AppError> {
        std::fs::create_dir_all(app_data_dir)?;

        let provider = WebProvider::new(config.recipes_url.clone(), config.http_timeout)?;
        let store = VaultSecureStore::new(
            app_data_dir,
            MasterKeySource::keychain(config.keychain_service.clone()),
        )
        .with_session_max_age(config.session_max_age);

        tracing::info!(
            url = %config.recipes_url,
            vault = %store.path().display(),
            biometric_available = gate.is_available(),
            "app state initialized"
        );

        Ok(Self::new(Arc::new(provider), gate, Arc::new(store), config))
    }

    /// 목록에서 레시피를 찾아 보안 저장
    pub async fn store_by_id(&self, id: &str) -> Result<String, AppError> {
        let recipe = self
            .catalog
            .find(id)
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))?;
        Ok(self.roundtrip.try_store(&recipe).await?)
    }
}
