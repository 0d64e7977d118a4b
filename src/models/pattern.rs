// src/models/pattern.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::{
    error::AppError,
    models::{category::CategoryRef, tag::Tag, validate_url_string},
};

pub const DIFFICULTIES: [&str; 3] = ["beginner", "intermediate", "advanced"];
pub const UNITS: [&str; 6] = ["grams", "meters", "yards", "pieces", "pairs", "none"];

/// A pattern as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PatternSummary {
    pub id: i64,
    /// Author ID; `None` once the author account is gone.
    pub author: Option<i64>,
    pub title: String,
    pub image_url: Option<String>,
    pub difficulty: String,
    pub saved_count: i64,
    pub tags: Json<Vec<Tag>>,
    pub categories: Json<Vec<CategoryRef>>,
}

/// Full pattern record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PatternDetail {
    pub id: i64,
    pub author: Option<i64>,
    pub title: String,
    pub description: String,
    pub tips: String,
    pub image_url: Option<String>,
    pub file_url: Option<String>,
    pub text_pattern: Option<String>,
    pub difficulty: String,
    pub hook_or_needle_size: f64,
    pub saved_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub tags: Json<Vec<Tag>>,
    pub categories: Json<Vec<CategoryRef>>,
    pub yarn_types: Json<Vec<Tag>>,
    pub materials: Json<Vec<Material>>,
}

/// Represents the 'materials' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub pattern: i64,
    pub name: String,
    pub amount: Option<f64>,
    pub unit: String,
}

/// DTO for publishing a pattern. Needs either a file or a text pattern.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatternRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 20000))]
    pub tips: String,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub file_url: Option<String>,

    pub text_pattern: Option<String>,

    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,

    /// Hook or needle size in millimeters.
    #[validate(range(
        exclusive_min = 0.0,
        message = "Crochet hook or Knitting needle size must be positive."
    ))]
    pub hook_or_needle_size: f64,

    #[serde(default)]
    pub yarn_types: Vec<i64>,
    #[serde(default)]
    pub categories: Vec<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
}

impl CreatePatternRequest {
    /// Field checks plus the file-or-text rule.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;

        let has_text = self.text_pattern.as_deref().is_some_and(|t| !t.trim().is_empty());
        if self.file_url.is_none() && !has_text {
            return Err(AppError::BadRequest(
                "You must provide either a file or a text pattern.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Query parameters for listing patterns.
#[derive(Debug, Default, Deserialize)]
pub struct PatternListParams {
    pub search: Option<String>,
    pub tag_id: Option<i64>,
    /// Category ID; matches patterns in the whole subtree.
    pub category: Option<i64>,
    pub yarn_type: Option<i64>,
    pub difficulty: Option<String>,
    /// `popular` (most saved first) or `-popular`.
    pub ordering: Option<String>,
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// DTO for adding a material to a pattern.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaterialRequest {
    pub pattern: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,
    #[validate(custom(function = validate_unit))]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaterialListParams {
    pub pattern: Option<i64>,
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    if !DIFFICULTIES.contains(&difficulty) {
        return Err(validator::ValidationError::new("invalid_difficulty"));
    }
    Ok(())
}

fn validate_unit(unit: &str) -> Result<(), validator::ValidationError> {
    if !UNITS.contains(&unit) {
        return Err(validator::ValidationError::new("invalid_unit"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePatternRequest {
        CreatePatternRequest {
            title: "Granny Square".to_string(),
            description: String::new(),
            tips: String::new(),
            image_url: None,
            file_url: None,
            text_pattern: Some("ch 4, join".to_string()),
            difficulty: "beginner".to_string(),
            hook_or_needle_size: 4.0,
            yarn_types: vec![],
            categories: vec![],
            tags: vec![],
        }
    }

    #[test]
    fn text_pattern_alone_is_enough() {
        assert!(request().check().is_ok());
    }

    #[test]
    fn file_or_text_is_required() {
        let mut req = request();
        req.text_pattern = Some("   ".to_string());
        assert_eq!(
            req.check(),
            Err(AppError::BadRequest(
                "You must provide either a file or a text pattern.".to_string()
            ))
        );

        req.file_url = Some("https://files.example/granny.pdf".to_string());
        assert!(req.check().is_ok());
    }

    #[test]
    fn non_positive_hook_size_is_rejected() {
        let mut req = request();
        req.hook_or_needle_size = 0.0;
        assert!(matches!(req.check(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let mut req = request();
        req.difficulty = "expert".to_string();
        assert!(req.check().is_err());
    }
}
