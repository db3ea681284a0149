//! Secure Item Commands
//!
//! 레시피 1개를 생체 인증으로 보호되는 저장소에 저장/조회합니다.
//! - 저장: 인증 없이 쓰기 (기존 항목 덮어씀)
//! - 조회: 호출마다 생체 인증 프롬프트 1회

use serde::Serialize;
use tauri::State;

use crate::app_state::AppState;
use crate::biometric::BiometryType;
use crate::error::CommandResult;
use crate::models::Recipe;
use crate::roundtrip::RetrievalState;

/// 생체 인증 가능 여부
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricStatusDto {
    pub available: bool,
    pub biometry_type: BiometryType,
}

/// 목록의 레시피를 보안 저장. 성공 시 레시피 id, 실패 시 `None`
#[tauri::command]
pub async fn store_item(id: String, state: State<'_, AppState>) -> CommandResult<Option<String>> {
    match state.store_by_id(&id).await {
        Ok(stored) => Ok(Some(stored)),
        Err(e) => {
            tracing::warn!(recipe_id = %id, error = %e, "store_item failed");
            Ok(None)
        }
    }
}

/// 저장된 레시피 조회 (생체 인증 필요). 실패 사유는 `retrieval_state`로 확인
#[tauri::command]
pub async fn retrieve_item(state: State<'_, AppState>) -> CommandResult<Option<Recipe>> {
    Ok(state.roundtrip.retrieve().await)
}

#[tauri::command]
pub fn retrieval_state(state: State<'_, AppState>) -> RetrievalState {
    state.roundtrip.state()
}

#[tauri::command]
pub fn biometric_status(state: State<'_, AppState>) -> BiometricStatusDto {
    let gate = state.roundtrip.gate();
    BiometricStatusDto {
        available: gate.is_available(),
        biometry_type: gate.biometry_type(),
    }
}
