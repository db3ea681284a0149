//! Recipe List Provider
//!
//! 고정 URL에서 레시피 JSON 배열을 가져옵니다.
//! - GET + `Accept: application/json`, 기본 타임아웃 10초
//! - non-2xx 또는 잘못된 본문은 하나의 종료 오류로 반환 (부분 결과 없음)

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::models::{Recipe, RecipeArray};

/// 레시피 목록 기본 URL
pub const DEFAULT_RECIPES_URL: &str =
    "https://hf-android-app.s3-eu-west-1.amazonaws.com/android-test/recipes.json";

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// 목록 조회 오류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Recipe request failed: {0}")]
    Request(String),

    #[error("Recipe request timed out")]
    Timeout,

    #[error("Recipe endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse recipe list: {0}")]
    Decode(String),

    #[error("Invalid recipe collection: {0}")]
    InvalidCollection(String),
}

/// 레시피 목록 공급자
#[async_trait]
pub trait RecipeListProvider: Send + Sync {
    async fn fetch_list(&self) -> Result<RecipeArray, FetchError>;
}

/// id가 비어 있지 않고 컬렉션 내에서 유일한지 확인
pub fn validate_collection(recipes: &[Recipe]) -> Result<(), FetchError> {
    let mut seen = HashSet::with_capacity(recipes.len());
    for (index, recipe) in recipes.iter().enumerate() {
        if !recipe.has_valid_id() {
            return Err(FetchError::InvalidCollection(format!(
                "recipe at index {} has an empty id",
                index
            )));
        }
        if !seen.insert(recipe.id.as_str()) {
            return Err(FetchError::InvalidCollection(format!(
                "duplicate recipe id: {}",
                recipe.id
            )));
        }
    }
    Ok(())
}

/// HTTP 공급자
pub struct WebProvider {
    http: reqwest::Client,
    url: Url,
}

impl WebProvider {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RecipeListProvider for WebProvider {
    async fn fetch_list(&self) -> Result<RecipeArray, FetchError> {
        let resp = self
            .http
            .get(self.url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request(e.to_string())
            }
        })?;
        let recipes: RecipeArray =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        validate_collection(&recipes)?;

        tracing::info!(url = %self.url, count = recipes.len(), "recipe list fetched");
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_recipe;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, timeout: Duration) -> WebProvider {
        let url = Url::parse(&format!("{}/android-test/recipes.json", server.uri())).unwrap();
        WebProvider::new(url, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_list_decodes_array() {
        let server = MockServer::start().await;
        let body = json!([sample_recipe("a1", "Soup"), sample_recipe("b2", "Salad")]);

        Mock::given(method("GET"))
            .and(path("/android-test/recipes.json"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let recipes = provider_for(&server, DEFAULT_TIMEOUT).fetch_list().await.unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].id, "a1");
        assert_eq!(recipes[1].name, "Salad");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider_for(&server, DEFAULT_TIMEOUT).fetch_list().await.unwrap_err();
        assert_eq!(err, FetchError::Status(503));
    }

    #[tokio::test]
    async fn test_malformed_body_is_single_error() {
        let server = MockServer::start().await;
        // 두 번째 항목의 difficulty 타입이 틀림 → 부분 결과 없이 실패
        let body = json!([
            sample_recipe("a1", "Soup"),
            {"id": "b2", "name": "Salad", "difficulty": "easy"}
        ]);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider_for(&server, DEFAULT_TIMEOUT).fetch_list().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let server = MockServer::start().await;
        let body = json!([sample_recipe("a1", "Soup"), sample_recipe("a1", "Soup again")]);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider_for(&server, DEFAULT_TIMEOUT).fetch_list().await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidCollection(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server, Duration::from_millis(50))
            .fetch_list()
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[test]
    fn test_validate_collection_empty_id() {
        let recipes = vec![sample_recipe("a1", "Soup"), sample_recipe("", "Nameless")];
        assert!(matches!(
            validate_collection(&recipes),
            Err(FetchError::InvalidCollection(_))
        ));
        assert!(validate_collection(&[]).is_ok());
    }
}
