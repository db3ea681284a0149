//! Recipe Codec
//!
//! 레시피 <-> 바이트 페이로드 직렬화 (JSON)

use crate::models::Recipe;

/// 코덱 오류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// 레시피를 저장용 바이트로 인코딩
///
/// 잘 만들어진 레시피라면 실패하지 않습니다. id가 비어 있는 레코드는 손상된 상태로 보고 거부합니다.
pub fn encode(recipe: &Recipe) -> Result<Vec<u8>, CodecError> {
    if !recipe.has_valid_id() {
        return Err(CodecError::Encoding("recipe id must not be empty".to_string()));
    }
    serde_json::to_vec(recipe).map_err(|e| CodecError::Encoding(e.to_string()))
}

/// 바이트 페이로드를 레시피로 디코딩
pub fn decode(bytes: &[u8]) -> Result<Recipe, CodecError> {
    let recipe: Recipe =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decoding(e.to_string()))?;
    if !recipe.has_valid_id() {
        return Err(CodecError::Decoding("recipe id must not be empty".to_string()));
    }
    Ok(recipe)
}
