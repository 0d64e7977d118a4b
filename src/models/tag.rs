use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A named lookup row: community tag, pattern tag or yarn type.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// DTO for creating a tag or yarn type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 chars"))]
    pub name: String,
}
