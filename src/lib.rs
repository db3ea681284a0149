//! RecipeApp - Tauri Backend Library
//!
//! 레시피 목록 조회와, 생체 인증으로 보호되는 단일 레시피 보관함을 담당합니다.
//! Tauri 셸(`app` feature) 없이도 코어 모듈은 그대로 사용할 수 있습니다.

pub mod app_state;
pub mod biometric;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod roundtrip;
pub mod secure_store;

#[cfg(feature = "app")]
pub mod commands;

pub use app_state::AppState;
pub use models::{Recipe, RecipeArray};
pub use roundtrip::{ErrorKind, RetrievalState, SecureItemRoundtrip, WritePolicy};

use tracing_subscriber::EnvFilter;

/// 로그 필터 기본값 (`RUST_LOG`가 없을 때)
pub const DEFAULT_LOG_FILTER: &str = "recipe_lib=info";

/// tracing subscriber 설치. 이미 설치되어 있으면 무시합니다.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// iOS: Keychain 접근 제어(`BIOMETRY_CURRENT_SET`)로 등록 세트에 바인딩된 게이트
#[cfg(all(feature = "app", target_os = "ios"))]
fn platform_gate<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    keychain_service: &str,
) -> std::sync::Arc<dyn biometric::BiometricGate> {
    std::sync::Arc::new(biometric::KeychainBiometricGate::new(
        biometric::ios::IosEnrollmentTokens::new(app.clone(), keychain_service),
    ))
}

/// 그 외 (데스크톱, Android): 영속 Keychain 백엔드나 등록 세트 식별자가 없어 보관함 비활성
#[cfg(all(feature = "app", not(target_os = "ios")))]
fn platform_gate<R: tauri::Runtime>(
    _app: &tauri::AppHandle<R>,
    _keychain_service: &str,
) -> std::sync::Arc<dyn biometric::BiometricGate> {
    std::sync::Arc::new(biometric::UnavailableBiometricGate)
}

/// Tauri 앱 실행
#[cfg(feature = "app")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    init_tracing();

    let builder = tauri::Builder::default();
    #[cfg(target_os = "ios")]
    let builder = builder.plugin(tauri_plugin_biometric::init());

    builder
        .setup(|app| {
            // .env.local / .env 는 없어도 무시
            let config = config::AppConfig::load()?;

            let app_data_dir = app.path().app_data_dir()?;
            let gate = platform_gate(app.handle(), &config.keychain_service);
            let state = AppState::from_config(&config, &app_data_dir, gate)?;

            // 앱 상태로 관리
            app.manage(state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::recipes::fetch_recipes,
            commands::recipes::get_recipe,
            commands::recipes::recipe_list_state,
            commands::secure_item::store_item,
            commands::secure_item::retrieve_item,
            commands::secure_item::retrieval_state,
            commands::secure_item::biometric_status,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
