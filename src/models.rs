//! Recipe Data Models
//!
//! 원격 JSON 엔드포인트 및 보안 저장소 페이로드와 매핑되는 데이터 모델

use serde::{Deserialize, Serialize};

/// 레시피 레코드
///
/// 네트워크 응답 또는 저장소 페이로드를 디코딩해서만 만들어지며, 생성 이후에는 변경하지 않습니다.
/// `id`는 컬렉션 내에서 유일한 기본 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub headline: String,
    pub description: String,
    pub difficulty: i32,
    /// 단위가 붙은 표시용 문자열 (예: "516 kcal")
    pub calories: String,
    pub carbos: String,
    pub fats: String,
    pub proteins: String,
    /// ISO-8601 duration (예: "PT35M")
    pub time: String,
    pub image: String,
    pub thumb: String,
}

/// 엔드포인트가 반환하는 레시피 배열
pub type RecipeArray = Vec<Recipe>;

impl Recipe {
    /// id가 비어 있지 않은지 확인
    pub fn has_valid_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_recipe(id: &str, name: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        headline: "with a crunchy topping".to_string(),
        description: "Warm and simple.".to_string(),
        difficulty: 1,
        calories: "100 kcal".to_string(),
        carbos: "12 g".to_string(),
        fats: "3 g".to_string(),
        proteins: "7 g".to_string(),
        time: "PT25M".to_string(),
        image: "https://img.example.com/soup.jpg".to_string(),
        thumb: "https://img.example.com/soup-thumb.jpg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_endpoint_shape() {
        let json = r#"{
            "calories": "516 kcal",
            "carbos": "47 g",
            "description": "There's nothing like the simple things in life.",
            "difficulty": 0,
            "fats": "8 g",
            "headline": "with Sweet Potato Wedges and Minted Snap Peas",
            "id": "533143aaff604d567f8b4571",
            "image": "https://img.hellofresh.com/q_auto/f_auto/recipes/image/533143aaff604d567f8b4571.jpg",
            "name": "Crispy Fish Goujons ",
            "proteins": "43 g",
            "thumb": "https://img.hellofresh.com/q_auto/f_auto/recipes/image/533143aaff604d567f8b4571-thumb.jpg",
            "time": "PT35M"
        }"#;

        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.id, "533143aaff604d567f8b4571");
        assert_eq!(recipe.difficulty, 0);
        assert_eq!(recipe.time, "PT35M");
        assert!(recipe.has_valid_id());
    }

    #[test]
    fn test_blank_id_is_invalid() {
        let recipe = sample_recipe("   ", "Soup");
        assert!(!recipe.has_valid_id());
    }
}
