//! Recipe Catalog
//!
//! 목록 화면 상태 (로딩/목록/실패) 관리

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{Recipe, RecipeArray};
use crate::provider::{FetchError, RecipeListProvider};

/// 목록 화면 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum ListState {
    Idle,
    Loading,
    Loaded(RecipeArray),
    Failed(String),
}

/// 레시피 목록 캐시 + 상태
pub struct RecipeCatalog {
    provider: Arc<dyn RecipeListProvider>,
    state: watch::Sender<ListState>,
}

impl RecipeCatalog {
    pub fn new(provider: Arc<dyn RecipeListProvider>) -> Self {
        let (state, _) = watch::channel(ListState::Idle);
        Self { provider, state }
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    /// 목록 다시 가져오기. 실패 시 이전 목록은 버려지고 `Failed`로 전이
    pub async fn refresh(&self) -> Result<RecipeArray, FetchError> {
        self.state.send_replace(ListState::Loading);

        match self.provider.fetch_list().await {
            Ok(recipes) => {
                self.state.send_replace(ListState::Loaded(recipes.clone()));
                Ok(recipes)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch recipe list");
                self.state.send_replace(ListState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// 현재 목록
    pub fn recipes(&self) -> RecipeArray {
        match &*self.state.borrow() {
            ListState::Loaded(recipes) => recipes.clone(),
            _ => Vec::new(),
        }
    }

    /// 현재 목록에서 id로 조회
    pub fn find(&self, id: &str) -> Option<Recipe> {
        match &*self.state.borrow() {
            ListState::Loaded(recipes) => recipes.iter().find(|r| r.id == id).cloned(),
            _ => None,
        }
    }
}
