use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::{comment::CommentResponse, tag::Tag, validate_url_string};

/// A post as shown in the community feed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub author: i64,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Tags aggregated as a JSON array by the query.
    pub tags: Json<Vec<Tag>>,

    pub comment_count: i64,
    pub likes_count: i64,
}

/// A single post with its discussion.
#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub has_pinned_comment: bool,
    /// Pinned comment first, then newest first.
    pub comments: Vec<CommentResponse>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content length must be between 1 and 10000 chars"
    ))]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<i64>,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Cursor for pagination: the created_at timestamp of the last post in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    /// Case-insensitive match on title or content.
    pub search: Option<String>,

    pub tag_id: Option<i64>,

    /// Only the caller's own posts.
    pub personal: Option<bool>,
}
