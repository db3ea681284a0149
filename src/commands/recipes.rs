//! Recipe List Commands
//!
//! 레시피 목록 조회 명령

use tauri::State;

use crate::app_state::AppState;
use crate::catalog::ListState;
use crate::error::{AppError, CommandResult};
use crate::models::Recipe;

/// 원격 엔드포인트에서 레시피 목록을 다시 가져오기
#[tauri::command]
pub async fn fetch_recipes(state: State<'_, AppState>) -> CommandResult<Vec<Recipe>> {
    state
        .catalog
        .refresh()
        .await
        .map_err(|e| AppError::from(e).into())
}

/// 현재 목록에서 단일 레시피 조회
#[tauri::command]
pub fn get_recipe(id: String, state: State<'_, AppState>) -> CommandResult<Recipe> {
    state
        .catalog
        .find(&id)
        .ok_or_else(|| AppError::RecipeNotFound(id).into())
}

#[tauri::command]
pub fn recipe_list_state(state: State<'_, AppState>) -> ListState {
    state.catalog.state()
}
